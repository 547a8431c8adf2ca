//! Metadata OBU (AV1 spec section 5.8 / Annex A).

use crate::bitreader::BitReader;
use crate::error::Result;
use crate::leb128::read_leb128;

const METADATA_TYPE_HDR_CLL: u32 = 1;
const METADATA_TYPE_HDR_MDCV: u32 = 2;
const METADATA_TYPE_SCALABILITY: u32 = 3;
const METADATA_TYPE_ITUT_T35: u32 = 4;
const METADATA_TYPE_TIMECODE: u32 = 5;
const SCALABILITY_SS: u8 = 14;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ItuT35 {
    pub country_code: u8,
    pub country_code_extension_byte: Option<u8>,
    pub payload_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HdrCll {
    pub max_cll: u16,
    pub max_fall: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HdrMdcv {
    pub primary_chromaticity_x: [u16; 3],
    pub primary_chromaticity_y: [u16; 3],
    pub white_point_chromaticity_x: u16,
    pub white_point_chromaticity_y: u16,
    pub luminance_max: u32,
    pub luminance_min: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TemporalGroupEntry {
    pub temporal_id: u8,
    pub temporal_group_decode_switching_point: bool,
    pub temporal_group_switching_point: bool,
    pub temporal_group_ref_pic_diff: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScalabilityStructure {
    pub spatial_layers_cnt_minus_1: u8,
    pub spatial_layer_dimensions: Vec<(u16, u16)>,
    pub spatial_layer_ref_id: Vec<u8>,
    pub temporal_group: Vec<TemporalGroupEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Scalability {
    pub scalability_mode_idc: u8,
    pub structure: Option<ScalabilityStructure>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Timecode {
    pub counting_type: u8,
    pub full_timestamp_flag: bool,
    pub discontinuity_flag: bool,
    pub cnt_dropped_flag: bool,
    pub n_frames: u16,
    pub seconds_value: Option<u8>,
    pub minutes_value: Option<u8>,
    pub hours_value: Option<u8>,
    pub time_offset_value: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Metadata {
    ItuT35(ItuT35),
    HdrCll(HdrCll),
    HdrMdcv(HdrMdcv),
    Scalability(Scalability),
    Timecode(Timecode),
    /// `metadata_type` not among the five defined types; body is not interpreted.
    Unknown(u32),
}

fn parse_scalability(r: &mut BitReader) -> Result<Scalability> {
    let scalability_mode_idc = r.read_bits(8)? as u8;
    let structure = if scalability_mode_idc == SCALABILITY_SS {
        let spatial_layers_cnt_minus_1 = r.read_bits(2)? as u8;
        let spatial_layer_dimensions_present_flag = r.read_flag()?;
        let spatial_layer_description_present_flag = r.read_flag()?;
        let temporal_group_description_present_flag = r.read_flag()?;
        r.skip_bits(3)?; // scalability_structure_reserved_3bits

        let mut spatial_layer_dimensions = Vec::new();
        if spatial_layer_dimensions_present_flag {
            for _ in 0..=spatial_layers_cnt_minus_1 {
                let w = r.read_bits(16)? as u16;
                let h = r.read_bits(16)? as u16;
                spatial_layer_dimensions.push((w, h));
            }
        }

        let mut spatial_layer_ref_id = Vec::new();
        if spatial_layer_description_present_flag {
            for _ in 0..=spatial_layers_cnt_minus_1 {
                spatial_layer_ref_id.push(r.read_bits(8)? as u8);
            }
        }

        let mut temporal_group = Vec::new();
        if temporal_group_description_present_flag {
            let temporal_group_size = r.read_bits(8)? as usize;
            for _ in 0..temporal_group_size {
                let temporal_id = r.read_bits(3)? as u8;
                let decode_switching_point = r.read_flag()?;
                let switching_point = r.read_flag()?;
                let ref_cnt = r.read_bits(3)? as usize;
                let mut diffs = Vec::with_capacity(ref_cnt);
                for _ in 0..ref_cnt {
                    diffs.push(r.read_bits(8)? as u8);
                }
                temporal_group.push(TemporalGroupEntry {
                    temporal_id,
                    temporal_group_decode_switching_point: decode_switching_point,
                    temporal_group_switching_point: switching_point,
                    temporal_group_ref_pic_diff: diffs,
                });
            }
        }

        Some(ScalabilityStructure {
            spatial_layers_cnt_minus_1,
            spatial_layer_dimensions,
            spatial_layer_ref_id,
            temporal_group,
        })
    } else {
        None
    };

    Ok(Scalability {
        scalability_mode_idc,
        structure,
    })
}

fn parse_timecode(r: &mut BitReader) -> Result<Timecode> {
    let counting_type = r.read_bits(5)? as u8;
    let full_timestamp_flag = r.read_flag()?;
    let discontinuity_flag = r.read_flag()?;
    let cnt_dropped_flag = r.read_flag()?;
    let n_frames = r.read_bits(9)? as u16;

    let (seconds_value, minutes_value, hours_value);
    if full_timestamp_flag {
        seconds_value = Some(r.read_bits(6)? as u8);
        minutes_value = Some(r.read_bits(6)? as u8);
        hours_value = Some(r.read_bits(5)? as u8);
    } else {
        let seconds_flag = r.read_flag()?;
        if seconds_flag {
            let s = r.read_bits(6)? as u8;
            let minutes_flag = r.read_flag()?;
            if minutes_flag {
                let m = r.read_bits(6)? as u8;
                let hours_flag = r.read_flag()?;
                let h = if hours_flag {
                    Some(r.read_bits(5)? as u8)
                } else {
                    None
                };
                seconds_value = Some(s);
                minutes_value = Some(m);
                hours_value = h;
            } else {
                seconds_value = Some(s);
                minutes_value = None;
                hours_value = None;
            }
        } else {
            seconds_value = None;
            minutes_value = None;
            hours_value = None;
        }
    }

    let time_offset_length = r.read_bits(5)? as u8;
    let time_offset_value = if time_offset_length > 0 {
        Some(r.read_bits(time_offset_length)?)
    } else {
        None
    };

    Ok(Timecode {
        counting_type,
        full_timestamp_flag,
        discontinuity_flag,
        cnt_dropped_flag,
        n_frames,
        seconds_value,
        minutes_value,
        hours_value,
        time_offset_value,
    })
}

/// Parses a Metadata OBU payload. `payload_bytes` is the declared OBU payload length,
/// used to size the ITU-T T.35 and unknown-type skip regions.
pub fn parse_metadata(r: &mut BitReader, payload_bytes: usize) -> Result<Metadata> {
    let start_byte = r.byte_position();
    let (metadata_type, _type_bytes) = read_leb128(r)?;

    let metadata = match metadata_type {
        METADATA_TYPE_HDR_CLL => Metadata::HdrCll(HdrCll {
            max_cll: r.read_bits(16)? as u16,
            max_fall: r.read_bits(16)? as u16,
        }),
        METADATA_TYPE_HDR_MDCV => {
            let mut x = [0u16; 3];
            let mut y = [0u16; 3];
            for i in 0..3 {
                x[i] = r.read_bits(16)? as u16;
                y[i] = r.read_bits(16)? as u16;
            }
            Metadata::HdrMdcv(HdrMdcv {
                primary_chromaticity_x: x,
                primary_chromaticity_y: y,
                white_point_chromaticity_x: r.read_bits(16)? as u16,
                white_point_chromaticity_y: r.read_bits(16)? as u16,
                luminance_max: r.read_bits(32)?,
                luminance_min: r.read_bits(32)?,
            })
        }
        METADATA_TYPE_SCALABILITY => Metadata::Scalability(parse_scalability(r)?),
        METADATA_TYPE_ITUT_T35 => {
            let country_code = r.read_bits(8)? as u8;
            let country_code_extension_byte = if country_code == 0xFF {
                Some(r.read_bits(8)? as u8)
            } else {
                None
            };
            // Leave the final byte for the mandatory trailing_bits() pattern; metadata
            // fields up to here are all byte-multiples, so the reader is byte-aligned.
            let header_bytes = r.byte_position() - start_byte;
            let payload_len = payload_bytes.saturating_sub(header_bytes).saturating_sub(1);
            r.skip_bits(8 * payload_len as u64)?;
            Metadata::ItuT35(ItuT35 {
                country_code,
                country_code_extension_byte,
                payload_len,
            })
        }
        METADATA_TYPE_TIMECODE => Metadata::Timecode(parse_timecode(r)?),
        other => {
            let consumed = r.byte_position() - start_byte;
            let remaining = payload_bytes.saturating_sub(consumed).saturating_sub(1);
            r.skip_bits(8 * remaining as u64)?;
            Metadata::Unknown(other)
        }
    };

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hdr_cll_round_trips_known_bytes() {
        let data = [0x01, 0x03, 0xE8, 0x01, 0xF4, 0x80];
        let mut r = BitReader::new(&data);
        let metadata = parse_metadata(&mut r, data.len()).unwrap();
        assert_eq!(
            metadata,
            Metadata::HdrCll(HdrCll {
                max_cll: 1000,
                max_fall: 500,
            })
        );
    }

    #[test]
    fn unknown_type_skips_remaining_bytes_short_of_trailing_bits() {
        let data = [0x63, 0xAA, 0xBB, 0x80];
        let mut r = BitReader::new(&data);
        let metadata = parse_metadata(&mut r, data.len()).unwrap();
        assert_eq!(metadata, Metadata::Unknown(0x63));
        assert_eq!(r.byte_position(), data.len() - 1);
        r.check_trailing_bits("METADATA").unwrap();
        assert_eq!(r.byte_position(), data.len());
    }

    #[test]
    fn itu_t35_leaves_trailing_bits_byte_for_check_trailing_bits() {
        // metadata_type=4 (ITU_T_T35), country_code=0x01 (no extension byte), then a
        // single trailing_bits() byte with zero T.35 payload bytes.
        let data = [0x04, 0x01, 0x80];
        let mut r = BitReader::new(&data);
        let metadata = parse_metadata(&mut r, data.len()).unwrap();
        assert_eq!(
            metadata,
            Metadata::ItuT35(ItuT35 {
                country_code: 0x01,
                country_code_extension_byte: None,
                payload_len: 0,
            })
        );
        r.check_trailing_bits("METADATA").unwrap();
    }
}
