use crate::fixed;
use crate::header::{FIELD_HEADER_LENGTH, FieldType, RECORD_HEADER_LENGTH, RecordHeader};
use crate::tags::dot11_common::{self, Dot11CommonTag};
use crate::tags::gps;
use nom::bytes::take;
use nom::number::{le_i8, le_u8, le_u16, le_u32, le_u64};
use nom::{IResult, Parser};

// Read-only decoder of assembled PPI records, the way a capture tool sees them.

#[derive(Clone, Debug, PartialEq)]
pub struct PpiRecord<'a> {
    pub header: RecordHeader,
    pub fields: Vec<Field<'a>>,
    /// Everything after the declared PPI length: the frame and, if any, its FCS.
    pub payload: &'a [u8],
}

#[derive(Clone, Debug, PartialEq)]
pub enum Field<'a> {
    Gps(GpsField),
    Dot11Common(Dot11CommonTag),
    Unknown { field_type: u16, data: &'a [u8] },
}

#[derive(Clone, Debug, PartialEq)]
pub struct GpsField {
    pub version: u8,
    pub magic: u8,
    pub length: u16,
    pub fields_present: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    /// Only read when no field between the altitude and the application id is present.
    pub app_id: Option<u32>,
}

pub fn parse_record(input: &[u8]) -> IResult<&[u8], PpiRecord<'_>> {
    let (rest, version) = le_u8().parse(input)?;
    if version != crate::header::PPI_VERSION {
        return Err(verify_error(input));
    }
    let (rest, flags) = le_u8().parse(rest)?;
    let (rest, length) = le_u16().parse(rest)?;
    let (rest, link_type) = le_u32().parse(rest)?;

    let fields_length = (length as usize)
        .checked_sub(RECORD_HEADER_LENGTH)
        .ok_or_else(|| verify_failure(input))?;
    let (payload, mut fields_bytes): (&[u8], &[u8]) = take(fields_length).parse(rest)?;

    let mut fields = vec![];
    while !fields_bytes.is_empty() {
        let (rest, field) = parse_field(fields_bytes)?;
        fields.push(field);
        fields_bytes = rest;
    }

    let header = RecordHeader {
        version,
        flags,
        length,
        link_type,
    };
    let end: &[u8] = &[];
    Ok((
        end,
        PpiRecord {
            header,
            fields,
            payload,
        },
    ))
}

pub fn parse_field(input: &[u8]) -> IResult<&[u8], Field<'_>> {
    let (rest, field_type) = le_u16().parse(input)?;
    let (rest, data_length) = le_u16().parse(rest)?;
    let (rest, data): (&[u8], &[u8]) = take(data_length as usize).parse(rest)?;

    let field = match FieldType::try_from(field_type) {
        Ok(FieldType::Gps) => Field::Gps(parse_gps(data)?.1),
        Ok(FieldType::Dot11Common) => Field::Dot11Common(parse_dot11_common(data)?.1),
        _ => Field::Unknown { field_type, data },
    };

    Ok((rest, field))
}

/// Body of a GPS field, field header excluded.
pub fn parse_gps(input: &[u8]) -> IResult<&[u8], GpsField> {
    let (rest, version) = le_u8().parse(input)?;
    let (rest, magic) = le_u8().parse(rest)?;
    let (rest, length) = le_u16().parse(rest)?;
    let (rest, fields_present) = le_u32().parse(rest)?;

    let (rest, latitude) = present_u32(rest, fields_present, gps::flags::LATITUDE)?;
    let (rest, longitude) = present_u32(rest, fields_present, gps::flags::LONGITUDE)?;
    let (rest, altitude) = present_u32(rest, fields_present, gps::flags::ALTITUDE)?;

    // Bits 4 to 28 carry fields of their own sizes, past them the layout is unknown.
    const SKIPPED_FIELDS: u32 = 0x1FFF_FFF0;
    let (rest, app_id) = match fields_present & SKIPPED_FIELDS {
        0 => present_u32(rest, fields_present, gps::flags::APP_ID)?,
        _ => (rest, None),
    };

    let latitude = latitude.map(fixed::from_fixed3_7);
    let longitude = longitude.map(fixed::from_fixed3_7);
    let altitude = altitude.map(fixed::from_fixed6_4);

    let field = GpsField {
        version,
        magic,
        length,
        fields_present,
        latitude,
        longitude,
        altitude,
        app_id,
    };
    Ok((rest, field))
}

/// Body of an 802.11-common field, field header excluded.
pub fn parse_dot11_common(input: &[u8]) -> IResult<&[u8], Dot11CommonTag> {
    if input.len() != dot11_common::LENGTH - FIELD_HEADER_LENGTH {
        return Err(verify_failure(input));
    }

    let (rest, tsf_timer) = le_u64().parse(input)?;
    let (rest, flags) = le_u16().parse(rest)?;
    let (rest, rate) = le_u16().parse(rest)?;
    let (rest, frequency_mhz) = le_u16().parse(rest)?;
    let (rest, channel_flags) = le_u16().parse(rest)?;
    let (rest, fhss_hopset) = le_u8().parse(rest)?;
    let (rest, fhss_pattern) = le_u8().parse(rest)?;
    let (rest, signal_dbm) = le_i8().parse(rest)?;
    let (rest, noise_dbm) = le_i8().parse(rest)?;

    let tag = Dot11CommonTag {
        tsf_timer,
        flags,
        rate,
        frequency_mhz,
        channel_flags,
        fhss_hopset,
        fhss_pattern,
        signal_dbm,
        noise_dbm,
    };
    Ok((rest, tag))
}

fn present_u32(input: &[u8], fields_present: u32, flag: u32) -> IResult<&[u8], Option<u32>> {
    if fields_present & flag == 0 {
        return Ok((input, None));
    }
    let (rest, value) = le_u32().parse(input)?;
    Ok((rest, Some(value)))
}

fn verify_error(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Verify))
}

fn verify_failure(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Verify))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FieldHeader;

    #[test]
    fn test_record_with_unknown_field() {
        let hex_actual = "00 00 10 00 69 00 00 00 \
            06 00 04 00 DE AD BE EF \
            AA BB"
            .replace(" ", "");
        let record = hex::decode(hex_actual).unwrap();

        let (rest, parsed) = parse_record(&record).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.header, RecordHeader::new(16, crate::DLT_IEEE802_11));
        assert_eq!(
            parsed.fields,
            vec![Field::Unknown {
                field_type: 6,
                data: &[0xDE, 0xAD, 0xBE, 0xEF],
            }]
        );
        assert_eq!(parsed.payload, &[0xAA, 0xBB]);
    }

    #[test]
    fn test_rejects_bad_version() {
        let record = hex::decode("0100080069000000").unwrap();
        assert!(parse_record(&record).is_err());
    }

    #[test]
    fn test_rejects_length_below_header() {
        let record = hex::decode("0000040069000000").unwrap();
        assert!(matches!(parse_record(&record), Err(nom::Err::Failure(_))));
    }

    #[test]
    fn test_rejects_truncated_fields() {
        // Header declares 24 bytes, only 12 follow.
        let record = hex::decode("0000180069000000 0200140000000000".replace(" ", "")).unwrap();
        assert!(parse_record(&record).is_err());
    }

    #[test]
    fn test_gps_field() {
        let tag = gps::GpsTag {
            latitude: fixed::to_fixed3_7(-33.8688),
            longitude: fixed::to_fixed3_7(151.2093),
            altitude: None,
        };
        let mut buffer = vec![0; tag.size()];
        tag.write(&mut buffer, 0);

        let (rest, field) = parse_field(&buffer).unwrap();
        assert!(rest.is_empty());

        let field = match field {
            Field::Gps(value) => value,
            other => panic!("Unexpected field: {other:?}"),
        };
        assert_eq!(field.version, gps::VERSION);
        assert_eq!(field.magic, gps::MAGIC);
        assert_eq!(field.length as usize, tag.size() - FIELD_HEADER_LENGTH);
        assert!((field.latitude.unwrap() + 33.8688).abs() < 1e-6);
        assert!((field.longitude.unwrap() - 151.2093).abs() < 1e-6);
        assert_eq!(field.altitude, None);
        assert_eq!(field.app_id, Some(gps::APP_ID));
    }

    #[test]
    fn test_dot11_common_needs_exact_length() {
        let mut buffer = vec![0; FIELD_HEADER_LENGTH + 4];
        FieldHeader::new(FieldType::Dot11Common, 4).write(&mut buffer, 0);

        assert!(parse_field(&buffer).is_err());
    }
}
