//! # 热泵文本帧解码
//!
//! 把设备上行的一段文本解析为 [`Frame`]。
//!
//! ## 帧格式
//!
//! ```text
//! START;T=2024-01-01T00:00:00;G=2;OLD=0;A.1=20.5;A.2=on;B.7=3;END
//! ```
//!
//! - 以 `;` 分段，段两侧空白忽略，空段忽略
//! - 第一段必须是 `START`
//! - `END` 之后的内容忽略
//! - `T=`：时间戳（`YYYY-MM-DDTHH:MM:SS`）
//! - `G=`：声明的分组数量（缺省时取实际解析到的分组数）
//! - `OLD=`：历史数据标志（`0`/`1`/`true`/`false`）
//! - `<分组>.<键>=<值>`：分组数据，分组按首次出现排序
//! - 其余段（无 `=` 或未知头部字段）忽略

use chrono::NaiveDateTime;
use domain::{DecodeError, Frame, FrameDecoder, FrameGroup};

const START_MARKER: &str = "START";
const END_MARKER: &str = "END";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 默认文本帧解码器。
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFrameDecoder;

impl TextFrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for TextFrameDecoder {
    fn decode(&self, text: &str) -> Result<Frame, DecodeError> {
        decode_text(text)
    }
}

/// 解码一段文本。
pub fn decode_text(text: &str) -> Result<Frame, DecodeError> {
    let mut segments = text
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty());

    if segments.next() != Some(START_MARKER) {
        return Err(DecodeError::MissingStart);
    }

    let mut timestamp = None;
    let mut declared_count = None;
    let mut is_old = false;
    let mut groups: Vec<FrameGroup> = Vec::new();

    for segment in segments {
        if segment == END_MARKER {
            break;
        }
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            "T" => timestamp = Some(parse_timestamp(value)?),
            "G" => declared_count = Some(parse_count(value)?),
            "OLD" => is_old = parse_flag(value)?,
            _ => {
                if let Some((group, field)) = key.split_once('.') {
                    push_field(&mut groups, group, field, value);
                }
            }
        }
    }

    if timestamp.is_none() && groups.is_empty() {
        return Err(DecodeError::Empty);
    }

    Ok(Frame {
        timestamp,
        is_old,
        count: declared_count.unwrap_or(groups.len()),
        groups,
    })
}

fn push_field(groups: &mut Vec<FrameGroup>, group: &str, field: &str, value: &str) {
    if group.is_empty() || field.is_empty() {
        return;
    }
    match groups.iter_mut().find(|existing| existing.name == group) {
        Some(existing) => existing.push(field, value),
        None => {
            let mut created = FrameGroup::new(group);
            created.push(field, value);
            groups.push(created);
        }
    }
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, DecodeError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|_| DecodeError::InvalidTimestamp(value.to_string()))
}

fn parse_count(value: &str) -> Result<usize, DecodeError> {
    value
        .parse::<usize>()
        .map_err(|_| DecodeError::InvalidCount(value.to_string()))
}

fn parse_flag(value: &str) -> Result<bool, DecodeError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(DecodeError::InvalidFlag(value.to_string())),
    }
}
