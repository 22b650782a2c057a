use serde::Serializer;

/// Optional sizes, written as hex when present.
pub(crate) fn serialize<S>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        None => serializer.serialize_none(),
        Some(value) if serializer.is_human_readable() => {
            serializer.serialize_some(&format!("{value:#x}"))
        }
        Some(value) => serializer.serialize_some(value),
    }
}
