//! The memory-map descriptor handed to the debugger.

use std::fmt::Write;

use probe_core_target::{NvmRegion, RamRegion};

use crate::Target;

/// Renders the memory-map descriptor for the given regions, in the order given.
///
/// RAM regions come first, followed by flash regions with their block size.
pub fn memory_map<'a>(
    ram: impl IntoIterator<Item = &'a RamRegion>,
    flash: impl IntoIterator<Item = &'a NvmRegion>,
) -> String {
    let mut map = String::from("<memory-map>");

    // Writing to a `String` cannot fail.
    for region in ram {
        let _ = write!(
            map,
            r#"<memory type="ram" start="{:#010x}" length="{:#010x}"/>"#,
            region.range.start,
            region.length()
        );
    }

    for region in flash {
        let _ = write!(
            map,
            r#"<memory type="flash" start="{:#010x}" length="{:#010x}">"#,
            region.range.start,
            region.length()
        );
        let _ = write!(
            map,
            r#"<property name="blocksize">{:#010x}</property></memory>"#,
            region.block_size
        );
    }

    map.push_str("</memory-map>");
    map
}

impl Target {
    /// Returns the memory-map descriptor of this target.
    ///
    /// The descriptor is generated on first use and kept for the lifetime of
    /// the target. Regions added afterwards are not reflected in it.
    pub fn memory_map(&self) -> &str {
        self.memory_map.get_or_init(|| {
            tracing::debug!("Generating memory map for {}", self.driver_name());
            memory_map(&self.ram, self.flash.iter().map(|flash| flash.region()))
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test::{MockDriver, MockFlash};

    fn demo_target() -> Target {
        let mut target = Target::new(MockDriver::new("demo"));
        target
            .add_ram(RamRegion::new(0x2000_0000..0x2000_5000))
            .unwrap();
        target
            .add_flash(
                NvmRegion::new(0x0800_0000..0x0801_0000, 0x400),
                MockFlash::default(),
            )
            .unwrap();
        target
    }

    #[test]
    fn descriptor_lists_ram_then_flash() {
        let target = demo_target();

        insta::assert_snapshot!(target.memory_map(), @r###"<memory-map><memory type="ram" start="0x20000000" length="0x00005000"/><memory type="flash" start="0x08000000" length="0x00010000"><property name="blocksize">0x00000400</property></memory></memory-map>"###);
    }

    #[test]
    fn empty_target_has_empty_map() {
        let target = Target::new(MockDriver::new("demo"));

        assert_eq!(target.memory_map(), "<memory-map></memory-map>");
    }

    #[test]
    fn regions_appear_most_recent_first() {
        let mut target = Target::new(MockDriver::new("demo"));
        target
            .add_ram(RamRegion::new(0x2000_0000..0x2000_1000))
            .unwrap();
        target
            .add_ram(RamRegion::new(0x1000_0000..0x1000_0100))
            .unwrap();

        let map = target.memory_map();
        let newer = map.find("0x10000000").unwrap();
        let older = map.find("0x20000000").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn map_is_generated_once() {
        let target = demo_target();

        let first = target.memory_map();
        let second = target.memory_map();

        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn map_keeps_regions_known_at_first_use() {
        let mut target = demo_target();
        let before = target.memory_map().to_owned();

        target
            .add_ram(RamRegion::new(0x1000_0000..0x1000_1000))
            .unwrap();

        assert_eq!(target.memory_map(), before);
    }

    #[test]
    fn large_catalogs_are_not_truncated() {
        let mut target = Target::new(MockDriver::new("demo"));
        for i in 0..64 {
            let start = 0x2000_0000 + i * 0x1000;
            target.add_ram(RamRegion::new(start..start + 0x1000)).unwrap();
        }

        let map = target.memory_map();
        assert_eq!(map.matches(r#"type="ram""#).count(), 64);
        assert!(map.ends_with("</memory-map>"));
    }
}
