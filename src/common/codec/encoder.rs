use crate::common::bitstream::BitStream;
use crate::common::codec::{total_bits, Segment, PADDING_CODEWORDS};
use crate::common::error::{QRError, QRResult};
use crate::common::metadata::{ECLevel, Version};

// Version selection & level boosting
//------------------------------------------------------------------------------

/// Finds the smallest version in the range whose data capacity admits
/// the segments, then optionally raises the error correction level as
/// far as the same version allows.
pub fn select_version(
    segments: &[Segment],
    ec_level: ECLevel,
    min_version: Version,
    max_version: Version,
    boost_ecl: bool,
) -> QRResult<(Version, ECLevel)> {
    let mut version = min_version;
    let used = loop {
        let capacity = version.data_bit_capacity(ec_level);
        match total_bits(segments, version) {
            Some(used) if used <= capacity => break used,
            _ if version >= max_version => return Err(QRError::DataTooLong),
            _ => version = Version::new(*version + 1),
        }
    };

    let mut ec_level = ec_level;
    if boost_ecl {
        for candidate in [ECLevel::M, ECLevel::Q, ECLevel::H] {
            if used <= version.data_bit_capacity(candidate) {
                ec_level = candidate;
            }
        }
    }

    Ok((version, ec_level))
}


// Writer for encoded data
//------------------------------------------------------------------------------

/// Concatenates segment headers and payloads, then fills the remaining
/// capacity with the terminator and padding.
pub fn assemble(segments: &[Segment], version: Version, ec_level: ECLevel) -> BitStream {
    let mut out = BitStream::new(version.data_bit_capacity(ec_level));
    for seg in segments {
        push_segment(seg, version, &mut out);
    }
    push_terminator(&mut out);
    push_padding_bits(&mut out);
    push_padding_codewords(&mut out);
    out
}

fn push_segment(seg: &Segment, version: Version, out: &mut BitStream) {
    out.push_bits(seg.mode() as u8, 4);
    let cc_bits = version.char_count_bits(seg.mode());
    debug_assert!(
        seg.num_chars() < 1 << cc_bits,
        "Char count exceeds bit length: Char count {}, Char count bits {cc_bits}",
        seg.num_chars()
    );
    out.push_bits(seg.num_chars() as u32, cc_bits);
    out.extend(seg.bits());
}

fn push_terminator(out: &mut BitStream) {
    let term_len = std::cmp::min(4, out.capacity() - out.len());
    out.push_bits(0u8, term_len);
}

fn push_padding_bits(out: &mut BitStream) {
    let offset = out.len() & 7;
    if offset > 0 {
        out.push_bits(0u8, 8 - offset);
    }
}

fn push_padding_codewords(out: &mut BitStream) {
    debug_assert!(out.len() & 7 == 0, "Bit offset should be zero before padding codewords");

    let remaining = (out.capacity() - out.len()) >> 3;
    PADDING_CODEWORDS.iter().copied().cycle().take(remaining).for_each(|pc| {
        out.push_bits(pc, 8);
    });
}
