//! Binary Mask - 二值掩码及 RLE 编解码
//!
//! RLE 文本格式: `value:count` 以逗号分隔，例如 `0:1234,1:567`

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MaskError {
    #[error("Invalid mask dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Mask data length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid RLE run: {0}")]
    InvalidRun(String),

    #[error("RLE run lengths overflow")]
    RunOverflow,

    #[error("Mask is not compressed")]
    NotCompressed,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// 二值掩码
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryMask {
    pub width: u32,
    pub height: u32,
    /// 行优先展开的像素值（0/1）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rle_data: Option<String>,
    #[serde(default)]
    pub is_compressed: bool,
    /// 前景像素数（缓存）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<u64>,
    #[serde(default = "default_version")]
    pub version: String,
}

impl BinaryMask {
    pub fn from_data(width: u32, height: u32, data: Vec<u8>) -> Result<Self, MaskError> {
        if width == 0 || height == 0 {
            return Err(MaskError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MaskError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            rle_data: None,
            is_compressed: false,
            area: None,
            version: default_version(),
        })
    }

    pub fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// 前景像素数：优先使用缓存的 area
    pub fn pixel_count(&self) -> u64 {
        if let Some(area) = self.area {
            return area;
        }
        if self.is_compressed {
            return self
                .rle_data
                .as_deref()
                .and_then(|rle| rle_foreground_count(rle).ok())
                .filter(|&count| count <= self.total_pixels())
                .unwrap_or(0);
        }
        self.data.iter().filter(|&&v| v != 0).count() as u64
    }

    /// 覆盖率 = 前景像素 / 总像素
    pub fn coverage(&self) -> f64 {
        let total = self.total_pixels();
        if total == 0 {
            return 0.0;
        }
        self.pixel_count() as f64 / total as f64
    }

    pub fn is_valid(&self) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        if self.is_compressed {
            self.rle_data
                .as_deref()
                .map(|rle| !rle.trim().is_empty())
                .unwrap_or(false)
        } else {
            self.data.len() as u64 == self.total_pixels()
        }
    }

    pub fn compress(&self) -> Result<Self, MaskError> {
        if self.is_compressed {
            return Ok(self.clone());
        }
        if !self.is_valid() {
            return Err(MaskError::LengthMismatch {
                expected: self.total_pixels() as usize,
                actual: self.data.len(),
            });
        }
        Ok(Self {
            width: self.width,
            height: self.height,
            data: Vec::new(),
            rle_data: Some(encode_rle(&self.data)),
            is_compressed: true,
            area: Some(self.pixel_count()),
            version: self.version.clone(),
        })
    }

    pub fn decompress(&self) -> Result<Self, MaskError> {
        if !self.is_compressed {
            return Err(MaskError::NotCompressed);
        }
        let rle = self.rle_data.as_deref().unwrap_or_default();
        let data = decode_rle(rle, self.total_pixels() as usize)?;
        Ok(Self {
            width: self.width,
            height: self.height,
            data,
            rle_data: None,
            is_compressed: false,
            area: self.area,
            version: self.version.clone(),
        })
    }
}

/// 行程编码
pub fn encode_rle(data: &[u8]) -> String {
    let mut runs: Vec<String> = Vec::new();
    let mut iter = data.iter().copied();
    let Some(mut current) = iter.next() else {
        return String::new();
    };
    let mut count = 1usize;
    for value in iter {
        if value == current {
            count += 1;
        } else {
            runs.push(format!("{}:{}", current, count));
            current = value;
            count = 1;
        }
    }
    runs.push(format!("{}:{}", current, count));
    runs.join(",")
}

fn parse_runs(rle: &str) -> impl Iterator<Item = Result<(u8, usize), MaskError>> + '_ {
    rle.split(',')
        .map(str::trim)
        .filter(|run| !run.is_empty())
        .map(|run| {
            let (value, count) = run
                .split_once(':')
                .ok_or_else(|| MaskError::InvalidRun(run.to_string()))?;
            let value = value
                .trim()
                .parse::<u8>()
                .map_err(|_| MaskError::InvalidRun(run.to_string()))?;
            let count = count
                .trim()
                .parse::<usize>()
                .map_err(|_| MaskError::InvalidRun(run.to_string()))?;
            Ok((value, count))
        })
}

/// 行程解码，结果长度必须等于 `expected_len`
///
/// 先校验游程总长再分配内存。
pub fn decode_rle(rle: &str, expected_len: usize) -> Result<Vec<u8>, MaskError> {
    let runs = parse_runs(rle).collect::<Result<Vec<_>, _>>()?;
    let mut total = 0usize;
    for &(_, count) in &runs {
        total = total.checked_add(count).ok_or(MaskError::RunOverflow)?;
        if total > expected_len {
            return Err(MaskError::LengthMismatch {
                expected: expected_len,
                actual: total,
            });
        }
    }
    if total != expected_len {
        return Err(MaskError::LengthMismatch {
            expected: expected_len,
            actual: total,
        });
    }

    let mut data = Vec::with_capacity(total);
    for (value, count) in runs {
        data.extend(std::iter::repeat(value).take(count));
    }
    Ok(data)
}

/// 不解码直接统计前景像素数
pub fn rle_foreground_count(rle: &str) -> Result<u64, MaskError> {
    parse_runs(rle).try_fold(0u64, |acc, run| {
        let (value, count) = run?;
        if value == 0 {
            return Ok(acc);
        }
        u64::try_from(count)
            .ok()
            .and_then(|count| acc.checked_add(count))
            .ok_or(MaskError::RunOverflow)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_count_and_coverage() {
        let mask = BinaryMask::from_data(2, 2, vec![1, 0, 1, 1]).unwrap();
        assert_eq!(mask.pixel_count(), 3);
        assert_eq!(mask.coverage(), 0.75);
        assert!(mask.is_valid());
    }

    #[test]
    fn test_from_data_rejects_wrong_length() {
        assert_eq!(
            BinaryMask::from_data(2, 2, vec![1, 0, 1]),
            Err(MaskError::LengthMismatch { expected: 4, actual: 3 })
        );
        assert!(matches!(
            BinaryMask::from_data(0, 2, vec![]),
            Err(MaskError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_cached_area_wins() {
        let mut mask = BinaryMask::from_data(2, 2, vec![1, 0, 1, 1]).unwrap();
        mask.area = Some(1);
        assert_eq!(mask.pixel_count(), 1);
    }

    #[test]
    fn test_rle_format() {
        assert_eq!(encode_rle(&[0, 0, 0, 1, 1, 0]), "0:3,1:2,0:1");
        assert_eq!(encode_rle(&[]), "");
        assert_eq!(rle_foreground_count("0:1234,1:567").unwrap(), 567);
    }

    #[test]
    fn test_compress_then_decompress() {
        let mask = BinaryMask::from_data(3, 2, vec![0, 1, 1, 1, 0, 0]).unwrap();
        let compressed = mask.compress().unwrap();
        assert!(compressed.is_compressed);
        assert!(compressed.data.is_empty());
        assert_eq!(compressed.rle_data.as_deref(), Some("0:1,1:3,0:2"));
        assert_eq!(compressed.pixel_count(), 3);
        assert!(compressed.is_valid());

        let restored = compressed.decompress().unwrap();
        assert_eq!(restored.data, mask.data);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(decode_rle("0:2,x", 2), Err(MaskError::InvalidRun(_))));
        assert!(matches!(decode_rle("0:3", 2), Err(MaskError::LengthMismatch { .. })));
        assert!(matches!(decode_rle("1:1", 2), Err(MaskError::LengthMismatch { .. })));
    }

    #[test]
    fn test_oversized_runs_are_rejected() {
        assert_eq!(
            rle_foreground_count("1:18446744073709551615,1:1"),
            Err(MaskError::RunOverflow)
        );
        assert_eq!(
            decode_rle("1:1,1:18446744073709551615", 4),
            Err(MaskError::RunOverflow)
        );
        assert_eq!(
            decode_rle("1:1,1:18446744073709551614", 4),
            Err(MaskError::LengthMismatch { expected: 4, actual: usize::MAX })
        );
        assert_eq!(
            decode_rle("1:18446744073709551615,1:1", usize::MAX),
            Err(MaskError::RunOverflow)
        );

        let mask: BinaryMask = serde_json::from_str(
            r#"{"width":2,"height":2,"isCompressed":true,"rleData":"1:18446744073709551615,1:1"}"#,
        )
        .unwrap();
        assert_eq!(mask.pixel_count(), 0);
        assert_eq!(mask.coverage(), 0.0);
        assert!(mask.decompress().is_err());
    }

    #[test]
    fn test_compressed_mask_without_rle_is_invalid() {
        let mask: BinaryMask =
            serde_json::from_str(r#"{"width":2,"height":2,"isCompressed":true,"rleData":" "}"#).unwrap();
        assert!(!mask.is_valid());
        assert_eq!(mask.version, "1.0");
    }
}
