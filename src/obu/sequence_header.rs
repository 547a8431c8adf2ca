//! Sequence Header OBU (AV1 spec section 5.5): sequence-wide parameters that every
//! later frame header depends on.

use crate::bitreader::BitReader;
use crate::error::{ParserError, Result};

pub const SELECT_SCREEN_CONTENT_TOOLS: u8 = 2;
pub const SELECT_INTEGER_MV: u8 = 2;

const COLOR_PRIMARIES_BT_709: u8 = 1;
const TRANSFER_CHARACTERISTICS_SRGB: u8 = 13;
const MATRIX_COEFFICIENTS_IDENTITY: u8 = 0;
const CP_TC_MC_UNSPECIFIED: u8 = 2;

/// `timing_info()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimingInfo {
    pub num_units_in_display_tick: u32,
    pub time_scale: u32,
    pub equal_picture_interval: bool,
    pub num_ticks_per_picture_minus_1: u32,
}

fn parse_timing_info(r: &mut BitReader) -> Result<TimingInfo> {
    let num_units_in_display_tick = r.read_bits(32)?;
    let time_scale = r.read_bits(32)?;
    if num_units_in_display_tick == 0 || time_scale == 0 {
        return Err(ParserError::BitstreamError(
            "timing_info: num_units_in_display_tick and time_scale must be nonzero".into(),
        ));
    }
    let equal_picture_interval = r.read_flag()?;
    let num_ticks_per_picture_minus_1 = if equal_picture_interval {
        let v = r.read_uvlc()?;
        if v == u32::MAX {
            return Err(ParserError::BitstreamError(
                "timing_info: num_ticks_per_picture_minus_1 uvlc overflow".into(),
            ));
        }
        v
    } else {
        0
    };
    Ok(TimingInfo {
        num_units_in_display_tick,
        time_scale,
        equal_picture_interval,
        num_ticks_per_picture_minus_1,
    })
}

/// `decoder_model_info()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DecoderModelInfo {
    pub buffer_delay_length_minus_1: u8,
    pub num_units_in_decoding_tick: u32,
    pub buffer_removal_time_length_minus_1: u8,
    pub frame_presentation_time_length_minus_1: u8,
}

impl DecoderModelInfo {
    pub fn buffer_delay_length(&self) -> u8 {
        self.buffer_delay_length_minus_1 + 1
    }

    pub fn frame_presentation_time_length(&self) -> u8 {
        self.frame_presentation_time_length_minus_1 + 1
    }

    pub fn buffer_removal_time_length(&self) -> u8 {
        self.buffer_removal_time_length_minus_1 + 1
    }
}

fn parse_decoder_model_info(r: &mut BitReader) -> Result<DecoderModelInfo> {
    let buffer_delay_length_minus_1 = r.read_bits(5)? as u8;
    let num_units_in_decoding_tick = r.read_bits(32)?;
    let buffer_removal_time_length_minus_1 = r.read_bits(5)? as u8;
    let frame_presentation_time_length_minus_1 = r.read_bits(5)? as u8;
    Ok(DecoderModelInfo {
        buffer_delay_length_minus_1,
        num_units_in_decoding_tick,
        buffer_removal_time_length_minus_1,
        frame_presentation_time_length_minus_1,
    })
}

/// `operating_parameters_info()`, folded into the owning `OperatingPoint`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperatingPoint {
    pub idc: u16,
    pub seq_level_idx: u8,
    pub seq_tier: u8,
    pub decoder_model_present_for_this_op: bool,
    pub bitrate_minus_1: u32,
    pub buffer_size_minus_1: u32,
    pub cbr_flag: bool,
    pub decoder_buffer_delay: u32,
    pub encoder_buffer_delay: u32,
    pub low_delay_mode_flag: bool,
    pub initial_display_delay_present_for_this_op: bool,
    pub initial_display_delay_minus_1: u8,
}

fn parse_operating_parameters_info(
    r: &mut BitReader,
    buffer_delay_length: u8,
) -> Result<(u32, u32, bool, u32, u32, bool)> {
    let bitrate_minus_1 = r.read_uvlc()?;
    let buffer_size_minus_1 = r.read_uvlc()?;
    let cbr_flag = r.read_flag()?;
    let decoder_buffer_delay = r.read_bits(buffer_delay_length)?;
    let encoder_buffer_delay = r.read_bits(buffer_delay_length)?;
    let low_delay_mode_flag = r.read_flag()?;
    Ok((
        bitrate_minus_1,
        buffer_size_minus_1,
        cbr_flag,
        decoder_buffer_delay,
        encoder_buffer_delay,
        low_delay_mode_flag,
    ))
}

/// `color_config()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColorConfig {
    pub bit_depth: u8,
    pub mono_chrome: bool,
    pub color_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
    pub color_range: bool,
    pub subsampling_x: u8,
    pub subsampling_y: u8,
    pub chroma_sample_position: u8,
    pub separate_uv_delta_q: bool,
    pub num_planes: u8,
}

fn parse_color_config(r: &mut BitReader, seq_profile: u8) -> Result<ColorConfig> {
    let high_bitdepth = r.read_flag()?;
    let bit_depth = if seq_profile == 2 && high_bitdepth {
        if r.read_flag()? { 12 } else { 10 }
    } else if high_bitdepth {
        10
    } else {
        8
    };

    let mono_chrome = if seq_profile == 1 {
        false
    } else {
        r.read_flag()?
    };
    let num_planes = if mono_chrome { 1 } else { 3 };

    let color_description_present = r.read_flag()?;
    let (color_primaries, transfer_characteristics, matrix_coefficients) =
        if color_description_present {
            (
                r.read_bits(8)? as u8,
                r.read_bits(8)? as u8,
                r.read_bits(8)? as u8,
            )
        } else {
            (
                CP_TC_MC_UNSPECIFIED,
                CP_TC_MC_UNSPECIFIED,
                CP_TC_MC_UNSPECIFIED,
            )
        };

    if mono_chrome {
        let color_range = r.read_flag()?;
        let separate_uv_delta_q = false;
        return Ok(ColorConfig {
            bit_depth,
            mono_chrome,
            color_primaries,
            transfer_characteristics,
            matrix_coefficients,
            color_range,
            subsampling_x: 1,
            subsampling_y: 1,
            chroma_sample_position: 0, // CSP_UNKNOWN
            separate_uv_delta_q,
            num_planes,
        });
    }

    let is_identity_srgb = color_primaries == COLOR_PRIMARIES_BT_709
        && transfer_characteristics == TRANSFER_CHARACTERISTICS_SRGB
        && matrix_coefficients == MATRIX_COEFFICIENTS_IDENTITY;

    let (color_range, subsampling_x, subsampling_y, chroma_sample_position);
    if is_identity_srgb {
        color_range = true;
        subsampling_x = 0;
        subsampling_y = 0;
        chroma_sample_position = 0;
    } else {
        color_range = r.read_flag()?;
        let (sx, sy) = match seq_profile {
            0 => (1, 1),
            1 => (0, 0),
            2 => {
                if bit_depth == 12 {
                    let sx = r.read_bits(1)? as u8;
                    let sy = if sx == 1 { r.read_bits(1)? as u8 } else { 0 };
                    (sx, sy)
                } else {
                    (1, 0)
                }
            }
            other => {
                return Err(ParserError::BitstreamError(format!(
                    "invalid seq_profile {other}"
                )));
            }
        };
        subsampling_x = sx;
        subsampling_y = sy;
        chroma_sample_position = if sx == 1 && sy == 1 {
            r.read_bits(2)? as u8
        } else {
            0
        };
    }

    let separate_uv_delta_q = r.read_flag()?;

    Ok(ColorConfig {
        bit_depth,
        mono_chrome,
        color_primaries,
        transfer_characteristics,
        matrix_coefficients,
        color_range,
        subsampling_x,
        subsampling_y,
        chroma_sample_position,
        separate_uv_delta_q,
        num_planes,
    })
}

/// The decoded Sequence Header OBU (AV1 spec section 5.5), owned by `ParserState`
/// until another sequence header replaces it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SequenceHeader {
    pub seq_profile: u8,
    pub still_picture: bool,
    pub reduced_still_picture_header: bool,

    pub timing_info: Option<TimingInfo>,
    pub decoder_model_info: Option<DecoderModelInfo>,
    pub initial_display_delay_present: bool,
    pub operating_points: Vec<OperatingPoint>,

    pub frame_width_bits: u8,
    pub frame_height_bits: u8,
    pub max_frame_width: u32,
    pub max_frame_height: u32,

    pub frame_id_numbers_present: bool,
    pub delta_frame_id_len: u8,
    pub additional_frame_id_len: u8,

    pub use_128x128_superblock: bool,
    pub enable_filter_intra: bool,
    pub enable_intra_edge_filter: bool,

    pub enable_interintra_compound: bool,
    pub enable_masked_compound: bool,
    pub enable_warped_motion: bool,
    pub enable_dual_filter: bool,
    pub enable_order_hint: bool,
    pub enable_jnt_comp: bool,
    pub enable_ref_frame_mvs: bool,
    pub seq_force_screen_content_tools: u8,
    pub seq_force_integer_mv: u8,
    pub order_hint_bits: u8,

    pub enable_superres: bool,
    pub enable_cdef: bool,
    pub enable_restoration: bool,

    pub color_config: ColorConfig,
    pub film_grain_params_present: bool,
}

/// `sequence_header_obu()`, followed by the mandatory trailing-bits tail.
pub fn parse_sequence_header(r: &mut BitReader) -> Result<SequenceHeader> {
    let seq_profile = r.read_bits(3)? as u8;
    let still_picture = r.read_flag()?;
    let reduced_still_picture_header = r.read_flag()?;

    let mut timing_info = None;
    let mut decoder_model_info = None;
    let mut initial_display_delay_present = false;
    let mut operating_points = Vec::new();

    if reduced_still_picture_header {
        let seq_level_idx = r.read_bits(5)? as u8;
        operating_points.push(OperatingPoint {
            seq_level_idx,
            ..Default::default()
        });
    } else {
        let timing_info_present = r.read_flag()?;
        let mut decoder_model_info_present = false;
        if timing_info_present {
            timing_info = Some(parse_timing_info(r)?);
            decoder_model_info_present = r.read_flag()?;
            if decoder_model_info_present {
                decoder_model_info = Some(parse_decoder_model_info(r)?);
            }
        }
        initial_display_delay_present = r.read_flag()?;
        let operating_points_cnt = r.read_bits(5)? as usize + 1;
        for i in 0..operating_points_cnt {
            let idc = r.read_bits(12)? as u16;
            let seq_level_idx = r.read_bits(5)? as u8;
            let seq_tier = if seq_level_idx > 7 {
                r.read_bits(1)? as u8
            } else {
                0
            };

            let mut op = OperatingPoint {
                idc,
                seq_level_idx,
                seq_tier,
                ..Default::default()
            };

            if decoder_model_info_present {
                op.decoder_model_present_for_this_op = r.read_flag()?;
                if op.decoder_model_present_for_this_op {
                    let buffer_delay_length = decoder_model_info
                        .as_ref()
                        .expect("decoder_model_info_present implies decoder_model_info is Some")
                        .buffer_delay_length();
                    let (
                        bitrate_minus_1,
                        buffer_size_minus_1,
                        cbr_flag,
                        decoder_buffer_delay,
                        encoder_buffer_delay,
                        low_delay_mode_flag,
                    ) = parse_operating_parameters_info(r, buffer_delay_length)?;
                    op.bitrate_minus_1 = bitrate_minus_1;
                    op.buffer_size_minus_1 = buffer_size_minus_1;
                    op.cbr_flag = cbr_flag;
                    op.decoder_buffer_delay = decoder_buffer_delay;
                    op.encoder_buffer_delay = encoder_buffer_delay;
                    op.low_delay_mode_flag = low_delay_mode_flag;
                }
            }
            if initial_display_delay_present {
                op.initial_display_delay_present_for_this_op = r.read_flag()?;
                if op.initial_display_delay_present_for_this_op {
                    op.initial_display_delay_minus_1 = r.read_bits(4)? as u8;
                }
            }

            operating_points.push(op);
            let _ = i;
        }
    }

    let frame_width_bits_minus_1 = r.read_bits(4)? as u8;
    let frame_height_bits_minus_1 = r.read_bits(4)? as u8;
    let frame_width_bits = frame_width_bits_minus_1 + 1;
    let frame_height_bits = frame_height_bits_minus_1 + 1;
    let max_frame_width = r.read_bits(frame_width_bits)? + 1;
    let max_frame_height = r.read_bits(frame_height_bits)? + 1;

    let frame_id_numbers_present = if reduced_still_picture_header {
        false
    } else {
        r.read_flag()?
    };
    let (mut delta_frame_id_len, mut additional_frame_id_len) = (0u8, 0u8);
    if frame_id_numbers_present {
        let delta_frame_id_length_minus_2 = r.read_bits(4)? as u8;
        let additional_frame_id_length_minus_1 = r.read_bits(3)? as u8;
        delta_frame_id_len = delta_frame_id_length_minus_2 + 2;
        additional_frame_id_len = additional_frame_id_length_minus_1 + 1;
        if additional_frame_id_len as u32 + delta_frame_id_len as u32 + 3 > 16 {
            return Err(ParserError::BitstreamError(
                "additional_frame_id_length + delta_frame_id_length + 3 > 16".into(),
            ));
        }
    }

    let use_128x128_superblock = r.read_flag()?;
    let enable_filter_intra = r.read_flag()?;
    let enable_intra_edge_filter = r.read_flag()?;

    let mut enable_interintra_compound = false;
    let mut enable_masked_compound = false;
    let mut enable_warped_motion = false;
    let mut enable_dual_filter = false;
    let mut enable_order_hint = false;
    let mut enable_jnt_comp = false;
    let mut enable_ref_frame_mvs = false;
    let seq_force_screen_content_tools;
    let mut seq_force_integer_mv = SELECT_INTEGER_MV;
    let mut order_hint_bits = 0u8;

    if reduced_still_picture_header {
        seq_force_screen_content_tools = SELECT_SCREEN_CONTENT_TOOLS;
    } else {
        enable_interintra_compound = r.read_flag()?;
        enable_masked_compound = r.read_flag()?;
        enable_warped_motion = r.read_flag()?;
        enable_dual_filter = r.read_flag()?;
        enable_order_hint = r.read_flag()?;
        if enable_order_hint {
            enable_jnt_comp = r.read_flag()?;
            enable_ref_frame_mvs = r.read_flag()?;
        }

        let seq_choose_screen_content_tools = r.read_flag()?;
        seq_force_screen_content_tools = if seq_choose_screen_content_tools {
            SELECT_SCREEN_CONTENT_TOOLS
        } else {
            r.read_bits(1)? as u8
        };

        if seq_force_screen_content_tools > 0 {
            let seq_choose_integer_mv = r.read_flag()?;
            seq_force_integer_mv = if seq_choose_integer_mv {
                SELECT_INTEGER_MV
            } else {
                r.read_bits(1)? as u8
            };
        } else {
            seq_force_integer_mv = SELECT_INTEGER_MV;
        }

        if enable_order_hint {
            let order_hint_bits_minus_1 = r.read_bits(3)? as u8;
            order_hint_bits = order_hint_bits_minus_1 + 1;
        }
    }

    let enable_superres = r.read_flag()?;
    let enable_cdef = r.read_flag()?;
    let enable_restoration = r.read_flag()?;

    let color_config = parse_color_config(r, seq_profile)?;

    let film_grain_params_present = r.read_flag()?;

    r.check_trailing_bits("SEQUENCE_HEADER")?;

    Ok(SequenceHeader {
        seq_profile,
        still_picture,
        reduced_still_picture_header,
        timing_info,
        decoder_model_info,
        initial_display_delay_present,
        operating_points,
        frame_width_bits,
        frame_height_bits,
        max_frame_width,
        max_frame_height,
        frame_id_numbers_present,
        delta_frame_id_len,
        additional_frame_id_len,
        use_128x128_superblock,
        enable_filter_intra,
        enable_intra_edge_filter,
        enable_interintra_compound,
        enable_masked_compound,
        enable_warped_motion,
        enable_dual_filter,
        enable_order_hint,
        enable_jnt_comp,
        enable_ref_frame_mvs,
        seq_force_screen_content_tools,
        seq_force_integer_mv,
        order_hint_bits,
        enable_superres,
        enable_cdef,
        enable_restoration,
        color_config,
        film_grain_params_present,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn push_bits(val: u32, n: u8, bits: &mut Vec<u8>) {
        for i in (0..n).rev() {
            bits.push(((val >> i) & 1) as u8);
        }
    }

    /// Packs a byte-aligned (length a multiple of 8) bit vector into bytes, MSB first.
    fn pack_bytes(bits: &[u8]) -> Vec<u8> {
        debug_assert_eq!(bits.len() % 8, 0);
        bits.chunks(8)
            .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| (byte << 1) | bit))
            .collect()
    }

    proptest! {
        #[test]
        fn reduced_still_picture_header_forces_defaults_prop(
            seq_level_idx in 0u32..32,
            width_bit in 0u32..2,
            height_bit in 0u32..2,
            use_128x128_superblock in any::<bool>(),
            enable_filter_intra in any::<bool>(),
            enable_intra_edge_filter in any::<bool>(),
            enable_superres in any::<bool>(),
            enable_cdef in any::<bool>(),
            enable_restoration in any::<bool>(),
            film_grain_params_present in any::<bool>(),
        ) {
            let mut b: Vec<u8> = Vec::new();
            push_bits(0, 3, &mut b); // seq_profile
            push_bits(1, 1, &mut b); // still_picture
            push_bits(1, 1, &mut b); // reduced_still_picture_header
            push_bits(seq_level_idx, 5, &mut b);
            push_bits(0, 4, &mut b); // frame_width_bits_minus_1 -> 1-bit field
            push_bits(0, 4, &mut b); // frame_height_bits_minus_1 -> 1-bit field
            push_bits(width_bit, 1, &mut b);
            push_bits(height_bit, 1, &mut b);
            // frame_id_numbers_present forced false, not read
            push_bits(use_128x128_superblock as u32, 1, &mut b);
            push_bits(enable_filter_intra as u32, 1, &mut b);
            push_bits(enable_intra_edge_filter as u32, 1, &mut b);
            // nine flags skipped (reduced)
            push_bits(enable_superres as u32, 1, &mut b);
            push_bits(enable_cdef as u32, 1, &mut b);
            push_bits(enable_restoration as u32, 1, &mut b);
            // color_config (seq_profile 0, mono_chrome path)
            push_bits(0, 1, &mut b); // high_bitdepth
            push_bits(1, 1, &mut b); // mono_chrome
            push_bits(0, 1, &mut b); // color_description_present
            push_bits(1, 1, &mut b); // color_range
            push_bits(film_grain_params_present as u32, 1, &mut b);
            push_bits(1, 1, &mut b); // trailing_bits terminator
            while b.len() % 8 != 0 {
                b.push(0);
            }

            let bytes = pack_bytes(&b);
            let mut r = BitReader::new(&bytes);
            let seq = parse_sequence_header(&mut r).unwrap();

            prop_assert!(seq.reduced_still_picture_header);
            prop_assert_eq!(seq.operating_points.len(), 1);
            prop_assert_eq!(seq.operating_points[0].seq_level_idx, seq_level_idx as u8);
            prop_assert!(seq.timing_info.is_none());
            prop_assert!(seq.decoder_model_info.is_none());
            prop_assert!(!seq.initial_display_delay_present);
            prop_assert!(!seq.frame_id_numbers_present);
            prop_assert!(!seq.enable_interintra_compound);
            prop_assert!(!seq.enable_masked_compound);
            prop_assert!(!seq.enable_warped_motion);
            prop_assert!(!seq.enable_dual_filter);
            prop_assert!(!seq.enable_order_hint);
            prop_assert!(!seq.enable_jnt_comp);
            prop_assert!(!seq.enable_ref_frame_mvs);
            prop_assert_eq!(seq.seq_force_screen_content_tools, SELECT_SCREEN_CONTENT_TOOLS);
            prop_assert_eq!(seq.seq_force_integer_mv, SELECT_INTEGER_MV);
            prop_assert_eq!(seq.use_128x128_superblock, use_128x128_superblock);
            prop_assert_eq!(seq.enable_filter_intra, enable_filter_intra);
            prop_assert_eq!(seq.enable_intra_edge_filter, enable_intra_edge_filter);
            prop_assert_eq!(seq.enable_superres, enable_superres);
            prop_assert_eq!(seq.enable_cdef, enable_cdef);
            prop_assert_eq!(seq.enable_restoration, enable_restoration);
            prop_assert_eq!(seq.film_grain_params_present, film_grain_params_present);
        }
    }

    #[test]
    fn aom_sample_sequence_header() {
        let data = [
            0x0a, 0x0a, 0x00, 0x00, 0x00, 0x01, 0x9f, 0xfb, 0xff, 0xf3, 0x00, 0x80,
        ];
        // First two bytes are a temporal-delimiter-less OBU header + size; the sequence
        // header payload itself starts at byte 2. Strip the leading header bytes to feed
        // the raw payload to the sequence header parser.
        let mut r = BitReader::new(&data[2..]);
        let seq = parse_sequence_header(&mut r).unwrap();
        assert_eq!(seq.seq_profile, 0);
        assert!(!seq.still_picture);
        assert!(!seq.reduced_still_picture_header);
        assert_eq!(seq.operating_points.len(), 1);
        assert_eq!(seq.operating_points[0].idc, 0);
        assert_eq!(seq.operating_points[0].seq_level_idx, 0);
        assert_eq!(seq.frame_width_bits, 4);
        assert_eq!(seq.frame_height_bits, 4);
        assert_eq!(seq.max_frame_width, 16);
        assert_eq!(seq.max_frame_height, 16);
        assert!(!seq.frame_id_numbers_present);
        assert!(seq.use_128x128_superblock);
        assert!(seq.enable_filter_intra);
        assert!(seq.enable_intra_edge_filter);
    }

    #[test]
    fn reduced_still_picture_header_forces_defaults() {
        // seq_profile=0(000), still_picture=1, reduced=1, seq_level_idx=00000
        // then frame_width_bits_minus_1(4)=0, frame_height_bits_minus_1(4)=0,
        // max_w_minus1(1 bit)=0, max_h_minus1(1 bit)=0, no frame ids,
        // use_128x128_superblock=0, filter_intra=0, intra_edge=0,
        // (reduced => skip nine flags) enable_superres=0, cdef=0, restoration=0,
        // color_config: high_bitdepth=0, mono_chrome=1(profile!=1 so read)=... this is
        // fiddly to hand-encode exactly; instead assert the reduced-path behavior using
        // the documented forcing rules directly via the parser's handling.
        let mut b = Vec::new();
        push_bits(0, 3, &mut b); // seq_profile
        push_bits(1, 1, &mut b); // still_picture
        push_bits(1, 1, &mut b); // reduced_still_picture_header
        push_bits(0, 5, &mut b); // seq_level_idx
        push_bits(0, 4, &mut b); // frame_width_bits_minus_1
        push_bits(0, 4, &mut b); // frame_height_bits_minus_1
        push_bits(0, 1, &mut b); // max_frame_width_minus_1
        push_bits(0, 1, &mut b); // max_frame_height_minus_1
        // frame_id_numbers_present forced false, not read
        push_bits(0, 1, &mut b); // use_128x128_superblock
        push_bits(0, 1, &mut b); // enable_filter_intra
        push_bits(0, 1, &mut b); // enable_intra_edge_filter
        // nine flags skipped (reduced)
        push_bits(0, 1, &mut b); // enable_superres
        push_bits(0, 1, &mut b); // enable_cdef
        push_bits(0, 1, &mut b); // enable_restoration
        // color_config
        push_bits(0, 1, &mut b); // high_bitdepth
        push_bits(1, 1, &mut b); // mono_chrome (profile 0 != 1, so read)
        push_bits(0, 1, &mut b); // color_description_present
        // mono_chrome branch: color_range
        push_bits(1, 1, &mut b); // color_range
        // separate_uv_delta_q not read for mono_chrome (function returns early)
        push_bits(0, 1, &mut b); // film_grain_params_present
        // trailing bits: 1 then pad to byte boundary
        push_bits(1, 1, &mut b);
        while b.len() % 8 != 0 {
            b.push(0);
        }

        let bytes = pack_bytes(&b);
        let mut r = BitReader::new(&bytes);
        let seq = parse_sequence_header(&mut r).unwrap();
        assert!(seq.reduced_still_picture_header);
        assert_eq!(seq.operating_points.len(), 1);
        assert!(seq.timing_info.is_none());
        assert!(!seq.enable_interintra_compound);
        assert!(!seq.enable_masked_compound);
        assert!(!seq.enable_warped_motion);
        assert!(!seq.enable_dual_filter);
        assert!(!seq.enable_order_hint);
        assert!(!seq.enable_jnt_comp);
        assert!(!seq.enable_ref_frame_mvs);
        assert_eq!(seq.seq_force_screen_content_tools, SELECT_SCREEN_CONTENT_TOOLS);
        assert_eq!(seq.seq_force_integer_mv, SELECT_INTEGER_MV);
    }
}
