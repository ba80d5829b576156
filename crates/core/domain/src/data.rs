use chrono::NaiveDateTime;

/// 分组内的单个键值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameField {
    pub key: String,
    pub value: String,
}

/// 解码后的数据分组（对中继不透明）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGroup {
    pub name: String,
    pub fields: Vec<FrameField>,
}

impl FrameGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// 追加字段，保持插入顺序。
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push(FrameField {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| field.value.as_str())
    }
}

/// 设备上行文本解码得到的帧。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub timestamp: Option<NaiveDateTime>,
    /// 帧引用的是历史数据。
    pub is_old: bool,
    /// 帧声明的分组数量。
    pub count: usize,
    pub groups: Vec<FrameGroup>,
}

/// 最近一次成功解码的帧快照。
///
/// 由观测存储独占持有，读者拿到的是不可变共享引用，后续替换不影响已读出的快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub timestamp: Option<NaiveDateTime>,
    pub is_old: bool,
    pub count: usize,
    pub groups: Vec<FrameGroup>,
    /// 产生该帧的原始文本。
    pub raw: String,
    /// 产生该帧的会话 ID。
    pub session_id: String,
    /// 发布时间戳（毫秒）。
    pub received_at_ms: i64,
}

impl Snapshot {
    pub fn from_frame(
        frame: Frame,
        raw: impl Into<String>,
        session_id: impl Into<String>,
        received_at_ms: i64,
    ) -> Self {
        Self {
            timestamp: frame.timestamp,
            is_old: frame.is_old,
            count: frame.count,
            groups: frame.groups,
            raw: raw.into(),
            session_id: session_id.into(),
            received_at_ms,
        }
    }
}

/// 获取当前时间戳（毫秒）
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
