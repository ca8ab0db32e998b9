mod matrix;

pub use matrix::QrCode;

use std::ops::Deref;

use crate::common::{
    codec::{assemble, select_version, Segment},
    ec,
    error::{QRError, QRResult},
    mask::{apply_best_mask, MaskPattern},
    metadata::{ECLevel, Version},
};

// Builder facade
//------------------------------------------------------------------------------

/// Encoding parameters; the payload itself is handed to the build
/// methods.
#[derive(Debug, Clone)]
pub struct QrBuilder {
    ec_level: ECLevel,
    min_version: Version,
    max_version: Version,
    mask: Option<MaskPattern>,
    boost_ecl: bool,
}

impl Default for QrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QrBuilder {
    pub fn new() -> Self {
        Self {
            ec_level: ECLevel::M,
            min_version: Version::MIN,
            max_version: Version::MAX,
            mask: None,
            boost_ecl: true,
        }
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn version_range(&mut self, min: Version, max: Version) -> &mut Self {
        self.min_version = min;
        self.max_version = max;
        self
    }

    /// Pins the symbol to one exact version.
    pub fn version(&mut self, version: Version) -> &mut Self {
        self.min_version = version;
        self.max_version = version;
        self
    }

    /// Forces a mask pattern instead of penalty-based selection.
    pub fn mask(&mut self, mask: MaskPattern) -> &mut Self {
        self.mask = Some(mask);
        self
    }

    pub fn boost_ecl(&mut self, boost_ecl: bool) -> &mut Self {
        self.boost_ecl = boost_ecl;
        self
    }

    pub fn metadata(&self) -> String {
        format!(
            "{{ Versions: {}-{}, Ec level: {:?}, Mask: {:?}, Boost: {} }}",
            *self.min_version, *self.max_version, self.ec_level, self.mask, self.boost_ecl
        )
    }

    pub fn build_text(&self, text: &str) -> QRResult<QrCode> {
        self.build_segments(&Segment::from_text(text))
    }

    pub fn build_binary(&self, data: &[u8]) -> QRResult<QrCode> {
        self.build_segments(&[Segment::bytes(data)])
    }

    pub fn build_segments(&self, segments: &[Segment]) -> QRResult<QrCode> {
        if self.min_version > self.max_version {
            return Err(QRError::InvalidVersion);
        }

        let (version, ec_level) = select_version(
            segments,
            self.ec_level,
            self.min_version,
            self.max_version,
            self.boost_ecl,
        )?;

        let encoded = assemble(segments, version, ec_level);
        debug_assert!(encoded.len() & 7 == 0, "Assembled data is not byte aligned");

        Ok(QrCode::with_codewords(version, ec_level, encoded.data(), self.mask))
    }
}

// Symbol construction
//------------------------------------------------------------------------------

impl QrCode {
    /// Builds a symbol from final data codewords: parity and
    /// interleaving, function patterns, data placement, masking.
    pub fn with_codewords(
        version: Version,
        ec_level: ECLevel,
        data: &[u8],
        mask: Option<MaskPattern>,
    ) -> QrCode {
        assert!(
            data.len() == version.data_codewords(ec_level),
            "Data codeword count doesn't match version capacity"
        );

        let payload = add_ecc_and_interleave(data, version, ec_level);

        let mut qr = QrCode::new(version, ec_level);
        qr.draw_all_function_patterns();
        qr.draw_encoding_region(&payload);

        match mask {
            Some(m) => qr.mask(m),
            None => {
                apply_best_mask(&mut qr);
            }
        }
        qr
    }

    pub fn encode_text(text: &str, ec_level: ECLevel) -> QRResult<QrCode> {
        QrBuilder::new().ec_level(ec_level).build_text(text)
    }

    pub fn encode_binary(data: &[u8], ec_level: ECLevel) -> QRResult<QrCode> {
        QrBuilder::new().ec_level(ec_level).build_binary(data)
    }

    pub fn encode_segments(segments: &[Segment], ec_level: ECLevel) -> QRResult<QrCode> {
        QrBuilder::new().ec_level(ec_level).build_segments(segments)
    }
}

// Codeword blocks, parity and interleaving
//------------------------------------------------------------------------------

fn add_ecc_and_interleave(data: &[u8], version: Version, ec_level: ECLevel) -> Vec<u8> {
    let num_blocks = version.num_blocks(ec_level);
    let block_ecc_len = version.ecc_per_block(ec_level);
    let raw_codewords = version.total_codewords();
    let num_short_blocks = num_blocks - raw_codewords % num_blocks;
    let short_block_len = raw_codewords / num_blocks;

    let data_blocks =
        blockify(data, num_blocks, short_block_len - block_ecc_len, num_short_blocks);

    let divisor = ec::generator_poly(block_ecc_len);
    let ecc_blocks: Vec<Vec<u8>> =
        data_blocks.iter().map(|b| ec::remainder(b, &divisor)).collect();

    let mut payload = interleave(&data_blocks);
    payload.extend(interleave(&ecc_blocks));
    debug_assert!(payload.len() == raw_codewords, "Interleaved payload length mismatch");
    payload
}

// Short blocks come first; the rest carry one extra data byte.
fn blockify(
    data: &[u8],
    num_blocks: usize,
    short_data_len: usize,
    num_short_blocks: usize,
) -> Vec<&[u8]> {
    let mut blocks = Vec::with_capacity(num_blocks);
    let mut k = 0;
    for i in 0..num_blocks {
        let len = short_data_len + usize::from(i >= num_short_blocks);
        blocks.push(&data[k..k + len]);
        k += len;
    }
    debug_assert!(k == data.len(), "Data doesn't fill blocks exactly");
    blocks
}

fn interleave<T: Copy, V: Deref<Target = [T]>>(blocks: &[V]) -> Vec<T> {
    let max_block_size = blocks.iter().map(|b| b.len()).max().expect("Blocks is empty");
    let total_size = blocks.iter().map(|b| b.len()).sum::<usize>();
    let mut res = Vec::with_capacity(total_size);
    for i in 0..max_block_size {
        for b in blocks {
            if i < b.len() {
                res.push(b[i]);
            }
        }
    }
    res
}



#[cfg(test)]
mod build_tests {
    use super::{QrBuilder, QrCode};
    use crate::common::error::QRError;
    use crate::common::mask::MaskPattern;
    use crate::common::metadata::{ECLevel, Version};

    #[test]
    fn test_encode_text_hello_world() {
        let qr = QrCode::encode_text("HELLO WORLD", ECLevel::Q).unwrap();
        assert_eq!(*qr.version(), 1);
        assert_eq!(qr.width(), 21);
        assert_eq!(qr.ec_level(), ECLevel::Q);
        assert!(qr.mask_pattern().is_some());
    }

    #[test]
    fn test_encode_text_high_level_bumps_version() {
        let qr = QrCode::encode_text("HELLO WORLD", ECLevel::H).unwrap();
        assert_eq!(*qr.version(), 2);
        assert_eq!(qr.ec_level(), ECLevel::H);
    }

    #[test]
    fn test_encode_empty_text() {
        let qr = QrCode::encode_text("", ECLevel::L).unwrap();
        assert_eq!(*qr.version(), 1);
        assert_eq!(qr.width(), 21);
    }

    #[test]
    fn test_encode_binary_max_capacity() {
        let qr = QrCode::encode_binary(&vec![0u8; 2953], ECLevel::L).unwrap();
        assert_eq!(*qr.version(), 40);
        assert_eq!(qr.ec_level(), ECLevel::L);
        assert_eq!(qr.width(), 177);
    }

    #[test]
    fn test_encode_binary_data_too_long() {
        let res = QrCode::encode_binary(&vec![0u8; 2954], ECLevel::L);
        assert_eq!(res.unwrap_err(), QRError::DataTooLong);
    }

    #[test]
    fn test_invalid_version_range() {
        let res = QrBuilder::new()
            .version_range(Version::new(10), Version::new(2))
            .build_text("hello");
        assert_eq!(res.unwrap_err(), QRError::InvalidVersion);
    }

    #[test]
    fn test_forced_mask() {
        for m in 0..8 {
            let qr = QrBuilder::new()
                .ec_level(ECLevel::M)
                .mask(MaskPattern::new(m))
                .build_text("FORCED MASK")
                .unwrap();
            assert_eq!(qr.mask_pattern(), Some(MaskPattern::new(m)));
        }
    }

    #[test]
    fn test_auto_mask_is_deterministic() {
        let a = QrCode::encode_text("determinism", ECLevel::M).unwrap();
        let b = QrCode::encode_text("determinism", ECLevel::M).unwrap();
        assert_eq!(a.mask_pattern(), b.mask_pattern());
        for y in 0..a.width() as i32 {
            for x in 0..a.width() as i32 {
                assert_eq!(a.get_module(x, y), b.get_module(x, y));
            }
        }
    }

    #[test]
    fn test_dark_module() {
        let qr = QrCode::encode_text("dark module", ECLevel::L).unwrap();
        let w = qr.width() as i32;
        assert!(qr.get_module(8, w - 8));
    }

    #[test]
    fn test_size_follows_version() {
        for (text, ecl) in [("a", ECLevel::L), ("HELLO WORLD", ECLevel::H)] {
            let qr = QrCode::encode_text(text, ecl).unwrap();
            assert_eq!(qr.width(), *qr.version() * 4 + 17);
        }
    }

    #[test]
    fn test_mask_involution() {
        let mut qr = QrCode::encode_text("INVOLUTION", ECLevel::M).unwrap();
        let before: Vec<bool> =
            (0..qr.width() as i32 * qr.width() as i32).map(|i| {
                let w = qr.width() as i32;
                qr.get_module(i % w, i / w)
            }).collect();
        let pattern = MaskPattern::new(3);
        qr.apply_mask(pattern);
        qr.apply_mask(pattern);
        let after: Vec<bool> =
            (0..qr.width() as i32 * qr.width() as i32).map(|i| {
                let w = qr.width() as i32;
                qr.get_module(i % w, i / w)
            }).collect();
        assert_eq!(before, after);
    }

    #[test]
    #[should_panic]
    fn test_with_codewords_wrong_length() {
        QrCode::with_codewords(Version::new(1), ECLevel::L, &[0u8; 18], None);
    }
}
