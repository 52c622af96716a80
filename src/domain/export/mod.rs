//! Export Context - 标注导出富化
//!
//! 职责:
//! - ISS / 3D / ISS_UNIFIED 字段提取（字段级容错）
//! - 二值掩码与 RLE 编解码
//! - ISS 导出强类型结构

mod iss;
mod mask;
mod processors;
mod record;

pub use iss::{BoundingBox, ChannelData, IssExport, MaskMetadata, MultiChannelMaskData, PixelAttribute};
pub use mask::{decode_rle, encode_rle, rle_foreground_count, BinaryMask, MaskError};
pub use processors::{
    enrich_export_record, is_3d_type, is_iss_type, parse_point_3d, process_3d_data,
    process_iss_data, process_iss_unified_data, validate_3d_data, validate_iss_data,
    validate_iss_unified_data, ExportFieldError, ISS_UNIFIED_TYPE,
};
pub use record::ExportRecord;
