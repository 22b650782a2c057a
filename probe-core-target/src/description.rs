use crate::memory::{check_overlap, NvmRegion, RamRegion, RegionError};
use serde::{Deserialize, Serialize};

/// Errors while loading a [`TargetDescription`].
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum DescriptionError {
    /// Failed to read the target description.
    Io(#[from] std::io::Error),
    /// Failed to parse the target description.
    Yaml(#[from] serde_yaml::Error),
    /// The target description contains an invalid memory region.
    Region(#[from] RegionError),
}

/// The memory layout of one target, as written in a YAML description file.
///
/// ```yaml
/// name: demo
/// ram:
///   - range: { start: 0x20000000, end: 0x20005000 }
/// flash:
///   - name: main
///     range: { start: 0x08000000, end: 0x08010000 }
///     block_size: 0x400
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDescription {
    /// Name of the target this layout belongs to.
    pub name: String,
    /// RAM regions, in the order they are registered.
    #[serde(default)]
    pub ram: Vec<RamRegion>,
    /// Flash regions, in the order they are registered.
    #[serde(default)]
    pub flash: Vec<NvmRegion>,
}

impl TargetDescription {
    /// Parses and validates a description from a YAML reader.
    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self, DescriptionError> {
        let description: Self = serde_yaml::from_reader(reader)?;
        description.validate()?;
        Ok(description)
    }

    /// Parses and validates a description from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DescriptionError> {
        let description: Self = serde_yaml::from_str(yaml)?;
        description.validate()?;
        Ok(description)
    }

    /// Serializes the description into YAML that
    /// [`TargetDescription::from_yaml_str`] reads back.
    ///
    /// `serde_yaml` writes the hex formatted fields as single quoted strings,
    /// e.g. `'0x20000000'`; the quotes are removed so they parse as integers.
    pub fn to_yaml_string(&self) -> Result<String, DescriptionError> {
        let raw_yaml_string = serde_yaml::to_string(self)?;

        let mut yaml_string = String::with_capacity(raw_yaml_string.len());
        for line in raw_yaml_string.lines() {
            if (line.contains("'0x") || line.contains("'0X")) && line.ends_with('\'') {
                yaml_string.push_str(&line.replace('\'', ""));
            } else {
                yaml_string.push_str(line);
            }
            yaml_string.push('\n');
        }

        Ok(yaml_string)
    }

    /// Validates every region on its own and makes sure no two regions overlap.
    ///
    /// This should be called right after a description is created by hand;
    /// the YAML constructors call it already.
    pub fn validate(&self) -> Result<(), RegionError> {
        let mut seen = Vec::with_capacity(self.ram.len() + self.flash.len());

        for ram in &self.ram {
            ram.validate()?;
            check_overlap(&ram.range, &seen)?;
            seen.push(ram.range.clone());
        }

        for flash in &self.flash {
            flash.validate()?;
            check_overlap(&flash.range, &seen)?;
            seen.push(flash.range.clone());
        }

        Ok(())
    }
}
