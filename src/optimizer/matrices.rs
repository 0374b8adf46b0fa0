//! State-space matrices `(A, B, C)` for the LTI formulation.
//!
//! Two source families are accepted, picked by file extension:
//! - serialized mappings `{A, B, C}` of row-major nested arrays
//!   (`.json`, `.yaml`/`.yml`, or bincode `.bin`);
//! - tagged-tensor XML (`.xml`) as written by DMDc fitting tools, where each
//!   matrix lives under `<Atilde>`/`<Btilde>`/`<Ctilde>` with a
//!   `<matrixShape>rows,cols</matrixShape>` and a flat `<real>` value list in
//!   column-major order.

use std::path::Path;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Violation};

#[derive(Debug, Clone, PartialEq)]
pub struct StateSpaceMatrices {
    pub a: DMatrix<f64>,
    pub b: DMatrix<f64>,
    pub c: Option<DMatrix<f64>>,
}

/// On-disk mapping layout. Rows are listed outermost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixMapping {
    #[serde(rename = "A")]
    pub a: Vec<Vec<f64>>,
    #[serde(rename = "B")]
    pub b: Vec<Vec<f64>>,
    #[serde(rename = "C", default)]
    pub c: Option<Vec<Vec<f64>>>,
}

impl StateSpaceMatrices {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let fail = |message: String| ConfigError::Matrix {
            path: path.to_path_buf(),
            message,
        };

        if !path.is_file() {
            return Err(fail("file not found".into()));
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let matrices = match ext.as_str() {
            "xml" => {
                let text = read_text(path)?;
                Self::from_tagged_xml(&text).map_err(fail)?
            }
            "json" => {
                let text = read_text(path)?;
                let m: MatrixMapping = serde_json::from_str(&text).map_err(|e| fail(e.to_string()))?;
                Self::from_mapping(&m).map_err(fail)?
            }
            "yaml" | "yml" => {
                let text = read_text(path)?;
                let m: MatrixMapping = serde_yaml::from_str(&text).map_err(|e| fail(e.to_string()))?;
                Self::from_mapping(&m).map_err(fail)?
            }
            "bin" => {
                let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let m: MatrixMapping = bincode::deserialize(&bytes).map_err(|e| fail(e.to_string()))?;
                Self::from_mapping(&m).map_err(fail)?
            }
            other => {
                return Err(fail(format!(
                    "unsupported extension `{other}` (expected json, yaml, yml, bin or xml)"
                )))
            }
        };

        debug!(
            path = %path.display(),
            states = matrices.a.nrows(),
            control = matrices.b.ncols(),
            measurements = matrices.c.as_ref().map(|c| c.nrows()).unwrap_or(0),
            "loaded state-space matrices"
        );
        Ok(matrices)
    }

    pub fn from_mapping(m: &MatrixMapping) -> Result<Self, String> {
        Ok(Self {
            a: from_rows("A", &m.a)?,
            b: from_rows("B", &m.b)?,
            c: m.c.as_ref().map(|rows| from_rows("C", rows)).transpose()?,
        })
    }

    pub fn to_mapping(&self) -> MatrixMapping {
        let rows = |m: &DMatrix<f64>| {
            m.row_iter()
                .map(|r| r.iter().copied().collect())
                .collect::<Vec<Vec<f64>>>()
        };
        MatrixMapping {
            a: rows(&self.a),
            b: rows(&self.b),
            c: self.c.as_ref().map(rows),
        }
    }

    pub fn from_tagged_xml(text: &str) -> Result<Self, String> {
        let doc = roxmltree::Document::parse(text).map_err(|e| e.to_string())?;
        let a = tagged_tensor(&doc, "Atilde")?.ok_or("missing <Atilde> tensor")?;
        let b = tagged_tensor(&doc, "Btilde")?.ok_or("missing <Btilde> tensor")?;
        let c = tagged_tensor(&doc, "Ctilde")?;
        Ok(Self { a, b, c })
    }

    /// Shape checks between the matrices themselves and against the variable counts.
    pub fn violations(
        &self,
        n_states: usize,
        n_control: usize,
        n_measurements: Option<usize>,
    ) -> Vec<Violation> {
        let mut out = Vec::new();
        let (ar, ac) = self.a.shape();
        let (br, bc) = self.b.shape();

        if ar != ac {
            out.push(Violation::new("A", format!("must be square, is {ar}x{ac}")));
        }
        if ar != br {
            out.push(Violation::new(
                "B",
                format!("has {br} rows, A has {ar}"),
            ));
        }
        if ar != n_states {
            out.push(Violation::new(
                "A",
                format!("has {ar} rows, {n_states} states are configured"),
            ));
        }
        if bc != n_control {
            out.push(Violation::new(
                "B",
                format!("has {bc} columns, {n_control} control variables are configured"),
            ));
        }

        // C only matters once measurements are configured
        if let Some(n_meas) = n_measurements {
            match &self.c {
                Some(c) => {
                    if c.ncols() != ar {
                        out.push(Violation::new(
                            "C",
                            format!("has {} columns, A has {ar} rows", c.ncols()),
                        ));
                    }
                    if c.nrows() != n_meas {
                        out.push(Violation::new(
                            "C",
                            format!("has {} rows, {n_meas} measurements are configured", c.nrows()),
                        ));
                    }
                }
                None => out.push(Violation::new(
                    "C",
                    "measurements are configured but no C matrix was loaded",
                )),
            }
        }

        out
    }
}

/// Builds a `rows x cols` matrix from values listed first-index-fastest.
pub fn reshape_column_major(
    values: &[f64],
    rows: usize,
    cols: usize,
) -> Result<DMatrix<f64>, String> {
    if values.len() != rows * cols {
        return Err(format!(
            "{} values cannot fill a {rows}x{cols} matrix",
            values.len()
        ));
    }
    Ok(DMatrix::from_column_slice(rows, cols, values))
}

fn read_text(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn from_rows(name: &str, rows: &[Vec<f64>]) -> Result<DMatrix<f64>, String> {
    let n_rows = rows.len();
    let n_cols = rows.first().map(Vec::len).unwrap_or(0);
    if n_rows == 0 || n_cols == 0 {
        return Err(format!("{name} is empty"));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != n_cols) {
        return Err(format!(
            "{name} row {bad} has {} entries, row 0 has {n_cols}",
            rows[bad].len()
        ));
    }
    Ok(DMatrix::from_fn(n_rows, n_cols, |r, c| rows[r][c]))
}

fn tagged_tensor(doc: &roxmltree::Document, tag: &str) -> Result<Option<DMatrix<f64>>, String> {
    let Some(node) = doc.descendants().find(|n| n.has_tag_name(tag)) else {
        return Ok(None);
    };

    let shape_text = node
        .descendants()
        .find(|n| n.has_tag_name("matrixShape"))
        .and_then(|n| n.text())
        .ok_or_else(|| format!("<{tag}> has no <matrixShape>"))?;
    let shape = shape_text
        .split(',')
        .map(|s| s.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("<{tag}> shape `{shape_text}`: {e}"))?;
    let &[rows, cols] = shape.as_slice() else {
        return Err(format!("<{tag}> shape `{shape_text}` is not two-dimensional"));
    };

    let values = node
        .descendants()
        .find(|n| n.has_tag_name("real"))
        .and_then(|n| n.text())
        .ok_or_else(|| format!("<{tag}> has no <real> values"))?
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("<{tag}> values: {e}"))?;

    reshape_column_major(&values, rows, cols)
        .map(Some)
        .map_err(|e| format!("<{tag}>: {e}"))
}
