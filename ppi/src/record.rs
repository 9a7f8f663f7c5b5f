use crate::extension::ExtensionEntry;
use crate::header::{RECORD_HEADER_LENGTH, RecordHeader};
use crate::metadata::{PacketEvent, Timestamp};
use crate::tags::dot11_common::{self, Dot11CommonTag};
use crate::tags::gps::{self, GpsTag};
use std::borrow::Cow;
use thiserror::Error;

pub const FCS_LENGTH: usize = 4;

/// Picks the bytes to log for an event instead of the default frame preference.
/// Returning `None` drops the event.
pub trait PayloadFilter: Send + Sync {
    fn select<'a>(&self, event: &'a PacketEvent) -> Option<Cow<'a, [u8]>>;
}

/// Reasons a single event produces no record. None of them affects the next event.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DropReason {
    #[error("Event carries no frame to log.")]
    NoPayload,

    #[error("Frame of {length} bytes is longer than the maximum of {maximum} bytes.")]
    Oversize { length: usize, maximum: usize },

    #[error("Record would be empty.")]
    Empty,

    #[error("PPI header and tags take {0} bytes, more than a PPI header can declare.")]
    TagsTooLong(usize),

    #[error("Record of {length} bytes is longer than the snapshot length of {maximum} bytes.")]
    RecordTooLong { length: usize, maximum: usize },
}

/// One complete PPI record, ready to be appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledRecord {
    pub timestamp: Timestamp,
    pub data: Vec<u8>,
    /// PPI header and every tag.
    pub tag_length: usize,
    pub payload_length: usize,
    pub fcs_length: usize,
}

impl AssembledRecord {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Everything that may put a tag in a record, in the order the tags are laid out.
///
/// The same list drives the size pass and the write pass, so both passes always
/// agree on which tags are present.
enum TagProducer<'a> {
    Gps,
    Dot11Common,
    Extension(&'a ExtensionEntry),
}

impl<'a> TagProducer<'a> {
    fn ordered(extensions: &'a [ExtensionEntry]) -> impl Iterator<Item = TagProducer<'a>> {
        [TagProducer::Gps, TagProducer::Dot11Common]
            .into_iter()
            .chain(extensions.iter().map(TagProducer::Extension))
    }

    fn size(&self, event: &PacketEvent) -> usize {
        match self {
            TagProducer::Gps => gps::size(event.gps.as_ref()),
            TagProducer::Dot11Common => dot11_common::size(event.radio.as_ref()),
            TagProducer::Extension(entry) => entry.query_size(event),
        }
    }

    /// Writes `size` bytes at `offset`, returns the offset right after them.
    fn write(
        &self, event: &PacketEvent, buffer: &mut [u8], offset: usize, size: usize,
    ) -> usize {
        match self {
            TagProducer::Gps => match event.gps.as_ref().and_then(GpsTag::from_fix) {
                Some(tag) => tag.write(buffer, offset),
                None => offset,
            },
            TagProducer::Dot11Common => {
                let tag = Dot11CommonTag::from_facets(
                    event.radio.as_ref(),
                    event.dot11.as_ref(),
                    event.checksum.as_ref(),
                );
                match tag {
                    Some(tag) => tag.write(buffer, offset),
                    None => offset,
                }
            },
            TagProducer::Extension(entry) => {
                let end = offset + size;
                let returned = entry.write(event, &mut buffer[..end], offset);
                if returned != end {
                    log::warn!(
                        "PPI extension declared {} bytes but reported {} written.",
                        size,
                        returned.saturating_sub(offset)
                    );
                }
                // The declared size is authoritative, the next tag starts right after it.
                end
            },
        }
    }
}

/// Builds PPI records out of packet events.
#[derive(Clone, Debug)]
pub struct RecordAssembler {
    link_type: u32,
    max_payload: usize,
}

impl RecordAssembler {
    pub fn new(link_type: u32) -> Self {
        Self {
            link_type,
            max_payload: crate::MAX_PACKET_LEN,
        }
    }

    pub fn link_type(&self) -> u32 {
        self.link_type
    }

    /// Frame to log: filter's choice when one is installed, otherwise the mangled
    /// frame, the decapsulated frame and the raw link frame, in that order.
    pub fn select_payload<'a>(
        event: &'a PacketEvent, filter: Option<&dyn PayloadFilter>,
    ) -> Option<Cow<'a, [u8]>> {
        if let Some(filter) = filter {
            return filter.select(event);
        }

        event
            .mangled
            .as_deref()
            .or(event.decapsulated.as_deref())
            .or(event.link_frame.as_deref())
            .map(Cow::Borrowed)
    }

    pub fn assemble(
        &self, event: &PacketEvent, extensions: &[ExtensionEntry],
        filter: Option<&dyn PayloadFilter>,
    ) -> Result<AssembledRecord, DropReason> {
        let payload = Self::select_payload(event, filter).ok_or(DropReason::NoPayload)?;
        if payload.len() > self.max_payload {
            return Err(DropReason::Oversize {
                length: payload.len(),
                maximum: self.max_payload,
            });
        }

        // Size pass
        let producers: Vec<(TagProducer, usize)> = TagProducer::ordered(extensions)
            .map(|producer| {
                let size = producer.size(event);
                (producer, size)
            })
            .collect();

        // Saturates, an absurd extension size then fails the u16 check below.
        let tag_length = producers
            .iter()
            .fold(RECORD_HEADER_LENGTH, |length, (_, size)| length.saturating_add(*size));
        let declared_length =
            u16::try_from(tag_length).map_err(|_| DropReason::TagsTooLong(tag_length))?;

        // The FCS goes after the frame only when it was captured along with radio data.
        let fcs = match (&event.checksum, &event.radio) {
            (Some(checksum), Some(_)) => Some(checksum.fcs),
            _ => None,
        };
        let fcs_length = fcs.map(|_| FCS_LENGTH).unwrap_or(0);

        let total_length = tag_length + payload.len() + fcs_length;
        if tag_length == 0 || total_length == 0 {
            return Err(DropReason::Empty);
        }
        if total_length > crate::SNAPLEN {
            return Err(DropReason::RecordTooLong {
                length: total_length,
                maximum: crate::SNAPLEN,
            });
        }

        // Allocation
        let mut data = vec![0u8; total_length];
        let mut cursor =
            RecordHeader::new(declared_length, self.link_type).write(&mut data, 0);

        // Write pass
        for (producer, size) in &producers {
            cursor = producer.write(event, &mut data, cursor, *size);
        }
        debug_assert_eq!(cursor, tag_length);

        // Payload
        let payload_end = cursor + payload.len();
        data[cursor..payload_end].copy_from_slice(&payload);
        cursor = payload_end;

        if let Some(fcs) = fcs {
            data[cursor..cursor + FCS_LENGTH].copy_from_slice(&fcs);
        }

        Ok(AssembledRecord {
            timestamp: event.timestamp,
            data,
            tag_length,
            payload_length: payload.len(),
            fcs_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::tests::FillExtension;
    use crate::extension::{AuxContext, PpiExtension};
    use crate::header::FIELD_HEADER_LENGTH;
    use crate::metadata::{Carrier, ChecksumInfo, Encoding, GpsFix, RadioInfo};
    use crate::{DLT_IEEE802_11, MAX_PACKET_LEN};
    use std::sync::{Arc, Mutex};

    fn assembler() -> RecordAssembler {
        RecordAssembler::new(DLT_IEEE802_11)
    }

    fn entry(extension: impl PpiExtension + 'static) -> ExtensionEntry {
        ExtensionEntry {
            encoder: Arc::new(extension),
            context: None,
        }
    }

    fn radio() -> RadioInfo {
        RadioInfo {
            data_rate: 12,
            frequency_mhz: 2412.0,
            signal_dbm: -50,
            noise_dbm: -90,
            encoding: Encoding::Ofdm,
            carrier: Carrier::Dot11g,
        }
    }

    fn event_with_frame(length: usize) -> PacketEvent {
        PacketEvent {
            link_frame: Some(vec![0x80; length]),
            ..PacketEvent::new(Timestamp::new(100, 200))
        }
    }

    #[test]
    fn test_no_payload_is_dropped() {
        let mut event = PacketEvent::new(Timestamp::default());
        event.radio = Some(radio());

        let result = assembler().assemble(&event, &[], None);
        assert_eq!(result, Err(DropReason::NoPayload));
    }

    #[test]
    fn test_oversize_payload_is_dropped() {
        let result = assembler().assemble(&event_with_frame(MAX_PACKET_LEN + 1), &[], None);
        assert_eq!(
            result,
            Err(DropReason::Oversize {
                length: MAX_PACKET_LEN + 1,
                maximum: MAX_PACKET_LEN,
            })
        );

        assert!(assembler().assemble(&event_with_frame(MAX_PACKET_LEN), &[], None).is_ok());
    }

    #[test]
    fn test_payload_preference() {
        let mut event = event_with_frame(3);
        assert_eq!(
            RecordAssembler::select_payload(&event, None).as_deref(),
            Some(&[0x80, 0x80, 0x80][..])
        );

        event.decapsulated = Some(vec![1]);
        assert_eq!(
            RecordAssembler::select_payload(&event, None).as_deref(),
            Some(&[1][..])
        );

        event.mangled = Some(vec![2]);
        assert_eq!(
            RecordAssembler::select_payload(&event, None).as_deref(),
            Some(&[2][..])
        );
    }

    #[test]
    fn test_filter_overrides_payload() {
        struct Truncate;

        impl PayloadFilter for Truncate {
            fn select<'a>(&self, event: &'a PacketEvent) -> Option<Cow<'a, [u8]>> {
                event.link_frame.as_deref().map(|frame| Cow::Owned(frame[..1].to_vec()))
            }
        }

        struct Nothing;

        impl PayloadFilter for Nothing {
            fn select<'a>(&self, _: &'a PacketEvent) -> Option<Cow<'a, [u8]>> {
                None
            }
        }

        let mut event = event_with_frame(10);
        event.decapsulated = Some(vec![9; 5]);

        let record = assembler().assemble(&event, &[], Some(&Truncate)).unwrap();
        assert_eq!(record.payload_length, 1);
        assert_eq!(record.data[RECORD_HEADER_LENGTH..], [0x80]);

        let result = assembler().assemble(&event, &[], Some(&Nothing));
        assert_eq!(result, Err(DropReason::NoPayload));
    }

    #[test]
    fn test_link_frame_only_is_header_and_payload() {
        let record = assembler().assemble(&event_with_frame(16), &[], None).unwrap();

        assert_eq!(record.tag_length, RECORD_HEADER_LENGTH);
        assert_eq!(record.len(), RECORD_HEADER_LENGTH + 16);
        assert_eq!(record.fcs_length, 0);
        assert_eq!(hex::encode(&record.data[..8]), "0000080069000000");
        assert_eq!(record.timestamp, Timestamp::new(100, 200));
    }

    #[test]
    fn test_gps_and_decapsulated_frame() {
        let mut event = PacketEvent::new(Timestamp::new(1, 2));
        event.decapsulated = Some(vec![0x42; 20]);
        event.gps = Some(GpsFix {
            fix: 3,
            latitude: 37.1,
            longitude: -122.3,
            altitude: 15.0,
        });

        let record = assembler().assemble(&event, &[], None).unwrap();

        assert_eq!(record.len(), RECORD_HEADER_LENGTH + 48);
        assert_eq!(record.tag_length, RECORD_HEADER_LENGTH + 28);
        assert_eq!(record.data[2..4], 36_u16.to_le_bytes());
        let present = u32::from_le_bytes([
            record.data[16],
            record.data[17],
            record.data[18],
            record.data[19],
        ]);
        assert_eq!(
            present,
            gps::flags::LATITUDE
                | gps::flags::LONGITUDE
                | gps::flags::ALTITUDE
                | gps::flags::APP_ID
        );
        assert_eq!(record.data[36..], [0x42; 20]);
    }

    #[test]
    fn test_fcs_is_appended_with_radio_and_checksum() {
        let mut event = event_with_frame(64);
        event.radio = Some(radio());
        event.checksum = Some(ChecksumInfo {
            valid: true,
            fcs: [1, 2, 3, 4],
        });

        let record = assembler().assemble(&event, &[], None).unwrap();
        assert_eq!(record.tag_length, RECORD_HEADER_LENGTH + dot11_common::LENGTH);
        assert_eq!(record.fcs_length, FCS_LENGTH);
        assert_eq!(record.len(), record.tag_length + 64 + FCS_LENGTH);
        assert_eq!(record.data[record.len() - 4..], [1, 2, 3, 4]);

        // Without radio data the checksum is neither flagged nor appended.
        event.radio = None;
        let record = assembler().assemble(&event, &[], None).unwrap();
        assert_eq!(record.fcs_length, 0);
        assert_eq!(record.len(), RECORD_HEADER_LENGTH + 64);
    }

    #[test]
    fn test_length_equations() {
        let mut event = event_with_frame(33);
        event.radio = Some(radio());
        event.checksum = Some(ChecksumInfo {
            valid: false,
            fcs: [0; 4],
        });
        event.gps = Some(GpsFix {
            fix: 2,
            latitude: 1.0,
            longitude: 2.0,
            altitude: 3.0,
        });
        let extensions = [
            entry(FillExtension { size: 5, fill: 1 }),
            entry(FillExtension { size: 0, fill: 2 }),
            entry(FillExtension { size: 7, fill: 3 }),
        ];

        let record = assembler().assemble(&event, &extensions, None).unwrap();

        let tags = 24 + dot11_common::LENGTH + 5 + 7;
        assert_eq!(record.tag_length, RECORD_HEADER_LENGTH + tags);
        assert_eq!(record.len(), RECORD_HEADER_LENGTH + tags + 33 + FCS_LENGTH);

        let declared = u16::from_le_bytes([record.data[2], record.data[3]]) as usize;
        assert_eq!(declared, record.len() - record.payload_length - record.fcs_length);

        // Extension regions sit right after the fixed tags, in registration order.
        let start = RECORD_HEADER_LENGTH + 24 + dot11_common::LENGTH;
        assert_eq!(record.data[start..start + 5], [1; 5]);
        assert_eq!(record.data[start + 5..start + 12], [3; 7]);
    }

    /// Records every call it receives.
    struct Probe {
        id: usize,
        size: usize,
        calls: Arc<Mutex<Vec<(usize, &'static str, usize)>>>,
    }

    impl PpiExtension for Probe {
        fn query_size(&self, _: &PacketEvent, context: Option<&AuxContext>) -> usize {
            assert!(context.is_none());
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((self.id, "size", 0));
            }
            self.size
        }

        fn write(
            &self, _: &PacketEvent, buffer: &mut [u8], offset: usize, _: Option<&AuxContext>,
        ) -> usize {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((self.id, "write", offset));
            }
            assert_eq!(buffer.len(), offset + self.size);
            offset + self.size
        }
    }

    #[test]
    fn test_extension_phases_and_cursors() {
        let calls = Arc::new(Mutex::new(vec![]));
        let sizes = [3, 0, 6];
        let extensions: Vec<ExtensionEntry> = sizes
            .iter()
            .enumerate()
            .map(|(id, size)| {
                entry(Probe {
                    id,
                    size: *size,
                    calls: Arc::clone(&calls),
                })
            })
            .collect();

        let mut event = event_with_frame(8);
        event.radio = Some(radio());
        assembler().assemble(&event, &extensions, None).unwrap();

        let fixed = RECORD_HEADER_LENGTH + dot11_common::LENGTH;
        let expected = vec![
            (0, "size", 0),
            (1, "size", 0),
            (2, "size", 0),
            (0, "write", fixed),
            (1, "write", fixed + 3),
            (2, "write", fixed + 3),
        ];
        assert_eq!(*calls.lock().unwrap(), expected);
    }

    #[test]
    fn test_misreporting_extension_keeps_layout() {
        struct Liar;

        impl PpiExtension for Liar {
            fn query_size(&self, _: &PacketEvent, _: Option<&AuxContext>) -> usize {
                4
            }

            fn write(
                &self, _: &PacketEvent, buffer: &mut [u8], offset: usize,
                _: Option<&AuxContext>,
            ) -> usize {
                buffer[offset] = 0xEE;
                offset + 1
            }
        }

        let extensions = [entry(Liar)];
        let record = assembler().assemble(&event_with_frame(2), &extensions, None).unwrap();

        assert_eq!(record.tag_length, RECORD_HEADER_LENGTH + 4);
        assert_eq!(record.data[RECORD_HEADER_LENGTH..], [0xEE, 0, 0, 0, 0x80, 0x80]);
    }

    #[test]
    fn test_oversized_tag_section_is_dropped() {
        let extensions = [entry(FillExtension {
            size: u16::MAX as usize,
            fill: 0,
        })];

        let result = assembler().assemble(&event_with_frame(1), &extensions, None);
        assert_eq!(
            result,
            Err(DropReason::TagsTooLong(RECORD_HEADER_LENGTH + u16::MAX as usize))
        );
    }

    #[test]
    fn test_absurd_extension_size_is_dropped() {
        struct Absurd;

        impl PpiExtension for Absurd {
            fn query_size(&self, _: &PacketEvent, _: Option<&AuxContext>) -> usize {
                usize::MAX
            }

            fn write(
                &self, _: &PacketEvent, _: &mut [u8], offset: usize, _: Option<&AuxContext>,
            ) -> usize {
                offset
            }
        }

        let extensions = [entry(FillExtension { size: 4, fill: 0 }), entry(Absurd)];
        let result = assembler().assemble(&event_with_frame(1), &extensions, None);

        assert_eq!(result, Err(DropReason::TagsTooLong(usize::MAX)));
    }

    #[test]
    fn test_record_longer_than_snaplen_is_dropped() {
        let mut event = event_with_frame(MAX_PACKET_LEN);
        event.radio = Some(radio());
        event.checksum = Some(ChecksumInfo {
            valid: true,
            fcs: [1, 2, 3, 4],
        });
        let extensions = [entry(FillExtension {
            size: 60_000,
            fill: 0,
        })];

        let tag_length = RECORD_HEADER_LENGTH + dot11_common::LENGTH + 60_000;
        let result = assembler().assemble(&event, &extensions, None);
        assert_eq!(
            result,
            Err(DropReason::RecordTooLong {
                length: tag_length + MAX_PACKET_LEN + FCS_LENGTH,
                maximum: crate::SNAPLEN,
            })
        );

        // Same tags with a short frame still fit.
        let mut event = event_with_frame(16);
        event.radio = Some(radio());
        let record = assembler().assemble(&event, &extensions, None).unwrap();
        assert_eq!(record.len(), tag_length + 16);
    }

    #[test]
    fn test_tag_data_lengths_exclude_field_header() {
        let mut event = event_with_frame(1);
        event.radio = Some(radio());
        let record = assembler().assemble(&event, &[], None).unwrap();

        let data_length = u16::from_le_bytes([record.data[10], record.data[11]]) as usize;
        assert_eq!(data_length, dot11_common::LENGTH - FIELD_HEADER_LENGTH);
    }
}
