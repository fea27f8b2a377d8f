//! STL (Stereolithography) loading.
//!
//! Supports both ASCII and binary STL.
//!
//! # Format Detection
//!
//! - ASCII files start with "solid" (after optional whitespace), carry no
//!   NUL byte in the first 80 bytes and their length does not match the
//!   binary size formula.
//! - Anything else is read as binary: an 80-byte header, a little-endian
//!   `u32` facet count, then 50 bytes per facet (normal, three vertices,
//!   attribute word).
//!
//! STL stores every facet with its own corners. Corners with bit-identical
//! coordinates are welded into one vertex so neighbouring triangles share
//! indices; region labeling and section stitching depend on that.

use std::collections::HashMap;
use std::path::Path;

use dlpslice_math::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::TriangleMesh;

/// STL binary header size in bytes.
const HEADER_SIZE: usize = 80;

/// Size of one facet record in binary STL.
const FACET_SIZE: usize = 50;

/// Load a mesh from an STL file, detecting ASCII or binary.
pub fn load_stl<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MeshError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MeshError::Io(e)
        }
    })?;
    let mesh = parse_stl(&bytes)?;
    log::info!(
        "loaded {}: {} triangles, {} vertices",
        path.display(),
        mesh.num_triangles(),
        mesh.num_vertices()
    );
    Ok(mesh)
}

/// Parse STL data already in memory.
pub fn parse_stl(bytes: &[u8]) -> Result<TriangleMesh> {
    let mesh = if is_ascii(bytes) {
        parse_ascii(&String::from_utf8_lossy(bytes))?
    } else {
        parse_binary(bytes)?
    };
    if mesh.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    Ok(mesh)
}

fn is_ascii(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(HEADER_SIZE)];
    if !String::from_utf8_lossy(head).trim_start().starts_with("solid") || head.contains(&0) {
        return false;
    }
    // Some exporters write "solid" into binary headers too.
    binary_facet_count(bytes).map_or(true, |count| {
        bytes.len() != HEADER_SIZE + 4 + count * FACET_SIZE
    })
}

fn binary_facet_count(bytes: &[u8]) -> Option<usize> {
    let raw = bytes.get(HEADER_SIZE..HEADER_SIZE + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
}

fn parse_binary(bytes: &[u8]) -> Result<TriangleMesh> {
    let count = binary_facet_count(bytes).ok_or(MeshError::Truncated {
        expected: HEADER_SIZE + 4,
        got: bytes.len(),
    })?;
    let expected = HEADER_SIZE + 4 + count * FACET_SIZE;
    if bytes.len() < expected {
        return Err(MeshError::Truncated {
            expected,
            got: bytes.len(),
        });
    }

    let mut welder = Welder::with_capacity(count);
    for (facet, record) in bytes[HEADER_SIZE + 4..expected]
        .chunks_exact(FACET_SIZE)
        .enumerate()
    {
        // Skip the normal (12 bytes); corners follow.
        let corners = [
            read_vertex(&record[12..24]),
            read_vertex(&record[24..36]),
            read_vertex(&record[36..48]),
        ];
        welder.push_facet(facet, corners)?;
    }
    Ok(welder.finish())
}

/// Read a vertex from 12 bytes (3 f32s).
fn read_vertex(buf: &[u8]) -> Point3 {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Point3::new(f64::from(x), f64::from(y), f64::from(z))
}

fn parse_ascii(text: &str) -> Result<TriangleMesh> {
    let mut welder = Welder::with_capacity(0);
    let mut corners: Vec<Point3> = Vec::with_capacity(3);
    let mut in_loop = false;
    let mut facet = 0;

    for (n, line) in text.lines().enumerate() {
        let line_no = n + 1;
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(keyword) = parts.first() else {
            continue;
        };

        match keyword.to_ascii_lowercase().as_str() {
            "outer" => {
                in_loop = true;
                corners.clear();
            }
            "vertex" => {
                if !in_loop {
                    return Err(parse_error(line_no, "vertex outside of a loop"));
                }
                if parts.len() < 4 {
                    return Err(parse_error(line_no, "vertex needs three coordinates"));
                }
                let mut xyz = [0.0; 3];
                for (slot, token) in xyz.iter_mut().zip(&parts[1..4]) {
                    *slot = token
                        .parse()
                        .map_err(|_| parse_error(line_no, &format!("bad coordinate {token:?}")))?;
                }
                corners.push(Point3::new(xyz[0], xyz[1], xyz[2]));
            }
            "endloop" => in_loop = false,
            "endfacet" => {
                let tri: [Point3; 3] = corners.as_slice().try_into().map_err(|_| {
                    parse_error(
                        line_no,
                        &format!("facet has {} vertices, expected 3", corners.len()),
                    )
                })?;
                welder.push_facet(facet, tri)?;
                corners.clear();
                facet += 1;
            }
            "endsolid" => break,
            _ => {}
        }
    }

    Ok(welder.finish())
}

fn parse_error(line: usize, message: &str) -> MeshError {
    MeshError::Parse {
        line,
        message: message.to_string(),
    }
}

fn weld_key(p: &Point3) -> [u64; 3] {
    // Adding 0.0 folds -0.0 into +0.0.
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

/// Builds an indexed mesh, merging bit-identical corners.
struct Welder {
    mesh: TriangleMesh,
    index: HashMap<[u64; 3], u32>,
    degenerate: usize,
}

impl Welder {
    fn with_capacity(facets: usize) -> Self {
        Self {
            mesh: TriangleMesh {
                vertices: Vec::with_capacity(facets / 2),
                triangles: Vec::with_capacity(facets),
            },
            index: HashMap::with_capacity(facets / 2),
            degenerate: 0,
        }
    }

    fn push_facet(&mut self, facet: usize, corners: [Point3; 3]) -> Result<()> {
        if corners
            .iter()
            .any(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(MeshError::NonFiniteVertex { facet });
        }
        let keys = corners.map(|p| weld_key(&p));
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[0] == keys[2] {
            self.degenerate += 1;
            return Ok(());
        }
        let tri = [0, 1, 2].map(|i| self.vertex(keys[i], corners[i]));
        self.mesh.triangles.push(tri);
        Ok(())
    }

    fn vertex(&mut self, key: [u64; 3], p: Point3) -> u32 {
        let vertices = &mut self.mesh.vertices;
        *self.index.entry(key).or_insert_with(|| {
            vertices.push(p);
            (vertices.len() - 1) as u32
        })
    }

    fn finish(self) -> TriangleMesh {
        if self.degenerate > 0 {
            log::debug!("skipped {} degenerate facet(s)", self.degenerate);
        }
        self.mesh
    }
}
