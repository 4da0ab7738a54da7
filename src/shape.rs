//! Shape records and the canonical tetromino set

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Side length of the occupancy grid
pub const GRID_SIZE: usize = 4;

/// 4x4 occupancy grid, row-major, 1 = occupied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix(pub [[u8; GRID_SIZE]; GRID_SIZE]);

impl Matrix {
    /// Parse a raw JSON value into a matrix.
    ///
    /// Returns `None` unless the value is exactly 4 arrays of exactly 4
    /// cells, each cell being `0`, `1`, `false` or `true`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let rows = value.as_array()?;
        if rows.len() != GRID_SIZE {
            return None;
        }

        let mut grid = [[0u8; GRID_SIZE]; GRID_SIZE];
        for (r, row) in rows.iter().enumerate() {
            let cells = row.as_array()?;
            if cells.len() != GRID_SIZE {
                return None;
            }
            for (c, cell) in cells.iter().enumerate() {
                grid[r][c] = match cell {
                    Value::Bool(b) => u8::from(*b),
                    Value::Number(n) => match n.as_u64() {
                        Some(v @ (0 | 1)) => v as u8,
                        _ => return None,
                    },
                    _ => return None,
                };
            }
        }

        Some(Matrix(grid))
    }

    /// Parse a matrix read back from the data file.
    ///
    /// Files written by older backends only guarantee the 4x4 shape, so any
    /// truthy cell (non-zero number, `true`, non-empty string other than
    /// `"0"`) counts as occupied.
    pub fn from_stored_value(value: &Value) -> Option<Self> {
        let rows = value.as_array()?;
        if rows.len() != GRID_SIZE {
            return None;
        }

        let mut grid = [[0u8; GRID_SIZE]; GRID_SIZE];
        for (r, row) in rows.iter().enumerate() {
            let cells = row.as_array()?;
            if cells.len() != GRID_SIZE {
                return None;
            }
            for (c, cell) in cells.iter().enumerate() {
                grid[r][c] = u8::from(is_truthy(cell));
            }
        }

        Some(Matrix(grid))
    }

    /// Number of occupied cells
    pub fn occupied(&self) -> usize {
        self.0.iter().flatten().filter(|&&cell| cell == 1).count()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |v| v != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// A stored shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub name: String,
    pub color: String,
    pub description: String,
    pub image: String,
    pub matrix: Matrix,
}

impl ShapeRecord {
    /// Rebuild a record from one element of the data file.
    ///
    /// Text fields may be strings or numbers. Returns `None` when the element
    /// is not an object, has no name, or its matrix is not 4x4.
    pub fn from_stored(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| match obj.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let name = text("name");
        if name.trim().is_empty() {
            return None;
        }

        Some(ShapeRecord {
            name,
            color: text("color"),
            description: text("description"),
            image: text("image"),
            matrix: Matrix::from_stored_value(obj.get("matrix")?)?,
        })
    }

    /// Case-insensitive name comparison
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_uppercase() == name.to_uppercase()
    }
}

fn canonical(name: &str, color: &str, description: &str, grid: [[u8; 4]; 4]) -> ShapeRecord {
    ShapeRecord {
        name: name.to_string(),
        color: color.to_string(),
        description: description.to_string(),
        image: format!("images/Tetromino_{}.svg", name),
        matrix: Matrix(grid),
    }
}

/// The seven tetrominoes a fresh catalog is seeded with: I, O, T, S, Z, J, L
pub fn default_shapes() -> Vec<ShapeRecord> {
    vec![
        canonical(
            "I",
            "#00FFFF",
            "De I-block is een lange rechte staaf van vier blokjes.",
            [[0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0]],
        ),
        canonical(
            "O",
            "#FFFF00",
            "De O-block is een vierkant van 2 bij 2 blokjes.",
            [[0, 1, 1, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
        ),
        canonical(
            "T",
            "#800080",
            "De T-block heeft een T-vorm met drie blokjes op een rij en één in het midden erboven.",
            [[0, 1, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
        ),
        canonical(
            "S",
            "#00FF00",
            "De S-block bestaat uit twee rijen van twee blokjes die verspringen.",
            [[0, 1, 1, 0], [1, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
        ),
        canonical(
            "Z",
            "#FF0000",
            "De Z-block is de spiegeling van de S-block.",
            [[1, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
        ),
        canonical(
            "J",
            "#0000FF",
            "De J-block lijkt op een omgekeerde L met een blokje links onderaan.",
            [[1, 0, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
        ),
        canonical(
            "L",
            "#FFA500",
            "De L-block heeft drie blokjes op een rij met één blokje rechts onderaan.",
            [[0, 0, 1, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_seven_tetrominoes() {
        let shapes = default_shapes();
        let names: Vec<&str> = shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["I", "O", "T", "S", "Z", "J", "L"]);

        for shape in &shapes {
            assert_eq!(shape.matrix.occupied(), 4, "{} must have 4 cells", shape.name);
            assert_eq!(shape.image, format!("images/Tetromino_{}.svg", shape.name));
        }
    }

    #[test]
    fn test_matrix_serializes_as_nested_arrays() {
        let shapes = default_shapes();
        let value = serde_json::to_value(&shapes[0].matrix).unwrap();
        assert_eq!(value, json!([[0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0]]));
    }

    #[test]
    fn test_matrix_from_value() {
        let m = Matrix::from_value(&json!([[0, 1, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]]));
        assert_eq!(m, Some(default_shapes()[2].matrix));

        let bools = Matrix::from_value(&json!([
            [false, true, false, false],
            [true, true, true, false],
            [false, false, false, false],
            [false, false, false, false]
        ]));
        assert_eq!(bools, m);
    }

    #[test]
    fn test_matrix_rejects_wrong_shapes() {
        // 3 rows
        assert!(Matrix::from_value(&json!([[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]])).is_none());
        // row with 5 columns
        assert!(Matrix::from_value(&json!([
            [0, 0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0]
        ]))
        .is_none());
        // cell out of range
        assert!(Matrix::from_value(&json!([[2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]])).is_none());
        assert!(Matrix::from_value(&json!("[[0]]")).is_none());
        assert!(Matrix::from_value(&json!([])).is_none());
    }

    #[test]
    fn test_stored_matrix_accepts_truthy_cells() {
        let m = Matrix::from_stored_value(&json!([
            [true, true, false, false],
            [0, "1", "0", ""],
            [2, null, 0.0, 1],
            [0, 0, 0, 0]
        ]))
        .unwrap();
        assert_eq!(m.0, [[1, 1, 0, 0], [0, 1, 0, 0], [1, 0, 0, 1], [0, 0, 0, 0]]);

        assert!(Matrix::from_stored_value(&json!([[0, 0, 0, 0]])).is_none());
    }

    #[test]
    fn test_from_stored_record() {
        let record = ShapeRecord::from_stored(&json!({
            "name": "Q",
            "color": "#010101",
            "description": "oud",
            "image": "images/q.png",
            "matrix": [[true, true, false, false], [true, true, false, false],
                       [false, false, false, false], [false, false, false, false]]
        }))
        .unwrap();
        assert_eq!(record.name, "Q");
        assert_eq!(record.matrix.occupied(), 4);

        assert!(ShapeRecord::from_stored(&json!({ "name": "", "matrix": [] })).is_none());
        assert!(ShapeRecord::from_stored(&json!({ "name": "R" })).is_none());
        assert!(ShapeRecord::from_stored(&json!("I")).is_none());
    }

    #[test]
    fn test_has_name_is_case_insensitive() {
        let l = default_shapes().pop().unwrap();
        assert!(l.has_name("l"));
        assert!(l.has_name("L"));
        assert!(!l.has_name("J"));
    }
}
