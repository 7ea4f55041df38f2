//! Variable metadata handed to the external cube writer.

use serde::{Deserialize, Serialize};

/// On-disk data type of a cube variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float32,
    Float64,
    Int16,
    Int32,
}

/// Static metadata describing one cube variable.
///
/// Produced once per provider; consumed by the external cube writer. The
/// optional fields are provenance metadata passed through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDescriptor {
    /// Variable name in the cube
    pub output_name: String,
    /// Variable name in the source files
    pub source_name: String,
    pub data_type: DataType,
    pub fill_value: f32,
    pub scale_factor: f64,
    pub add_offset: f64,
    pub units: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl VariableDescriptor {
    /// Create a descriptor with identity scaling and no provenance metadata.
    pub fn new(
        output_name: impl Into<String>,
        source_name: impl Into<String>,
        data_type: DataType,
        fill_value: f32,
        units: impl Into<String>,
    ) -> Self {
        Self {
            output_name: output_name.into(),
            source_name: source_name.into(),
            data_type,
            fill_value,
            scale_factor: 1.0,
            add_offset: 0.0,
            units: units.into(),
            long_name: None,
            standard_name: None,
            references: None,
            comment: None,
            url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_skips_empty_provenance() {
        let desc = VariableDescriptor::new("t2m", "t2m", DataType::Float32, -32767.0, "K");
        let json = serde_json::to_string(&desc).unwrap();
        assert!(json.contains("\"output_name\":\"t2m\""));
        assert!(!json.contains("long_name"));
        assert!(!json.contains("references"));
    }
}
