/// Guide: How to Add a Tag
/// 1. Write an encoder in its own module, e.g. `tags::custom_tag`, with a constructor
///    that returns `None` when the event does not carry the needed facets.
/// 2. The encoder must report its exact `size()` and `write()` exactly that many bytes.
/// 3. Add a variant to `record::TagProducer` and place it in `TagProducer::fixed()`
///    according to the order it has to take inside the record.
///
/// Third-party tags don't need any of that, see `extension::PpiExtension`.
pub mod dot11_common;
pub mod gps;

/// Copies `bytes` at `offset` and returns the offset right after them.
pub(crate) fn put<const N: usize>(buffer: &mut [u8], offset: usize, bytes: [u8; N]) -> usize {
    let end = offset + N;
    buffer[offset..end].copy_from_slice(&bytes);
    end
}
