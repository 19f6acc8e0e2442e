//! Layer-shape loader boundary (spec.md §6).
//!
//! This is a stand-in for the external `modelfile_to_mapping.py`
//! preprocessor, not a reimplementation of it: it reads a minimal
//! line-oriented format (`name N K C X Y R S`, `#`-prefixed comment lines
//! ignored) sufficient to exercise the rest of the pipeline. `layer_type`
//! is always forced to `"CONV"` at this boundary (spec.md §6's documented
//! known limitation — `DSCONV` segfaults the native evaluator).

use crate::error::{AccelError, Result};
use crate::space::software::LayerShape;
use std::path::Path;

/// One named layer plus its [`LayerShape`] (spec.md §3's "Shape tuple").
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub shape: LayerShape,
    /// Always `"CONV"` at this boundary (spec.md §6).
    pub layer_type: &'static str,
}

/// Parse the model file at `path` into an ordered list of layers.
pub fn load_layers(path: &Path) -> Result<Vec<Layer>> {
    let text = std::fs::read_to_string(path)?;
    let mut layers = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        layers.push(parse_line(path, line_no + 1, line)?);
    }
    if layers.is_empty() {
        return Err(AccelError::ShapeFile {
            file: path.to_path_buf(),
            message: "no layers found".to_string(),
        });
    }
    Ok(layers)
}

fn parse_line(path: &Path, line_no: usize, line: &str) -> Result<Layer> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 8 {
        return Err(AccelError::ShapeFile {
            file: path.to_path_buf(),
            message: format!("line {line_no}: expected `name N K C X Y R S`, got `{line}`"),
        });
    }
    let name = fields[0].to_string();
    let mut dims = [0i64; 7];
    for (i, field) in fields[1..].iter().enumerate() {
        dims[i] = field.parse::<i64>().map_err(|e| AccelError::ShapeFile {
            file: path.to_path_buf(),
            message: format!("line {line_no}: invalid integer `{field}`: {e}"),
        })?;
    }
    Ok(Layer {
        name,
        shape: LayerShape {
            n: dims[0],
            k: dims[1],
            c: dims[2],
            x: dims[3],
            y: dims[4],
            r: dims[5],
            s: dims[6],
        },
        layer_type: "CONV",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_layers_and_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# a model").unwrap();
        writeln!(file, "conv1 1 4 2 8 8 3 3").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "conv2 1 8 4 4 4 3 3").unwrap();
        let layers = load_layers(file.path()).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].name, "conv1");
        assert_eq!(layers[0].shape.k, 4);
        assert_eq!(layers[0].layer_type, "CONV");
    }

    #[test]
    fn rejects_malformed_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "conv1 1 4 2 8 8 3").unwrap();
        assert!(load_layers(file.path()).is_err());
    }

    #[test]
    fn rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_layers(file.path()).is_err());
    }
}
