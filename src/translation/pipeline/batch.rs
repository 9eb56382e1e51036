//! 翻译批次模块
//!
//! 把目标按顺序切分为不超过 `max_batch_size` 的批次，并记录一次翻译调用的结果汇总。
//! 批次之间严格顺序执行，批次内的顺序就是提交给翻译后端的顺序。

use super::filters::TextFilter;
use super::target::Target;

/// 一个翻译批次
#[derive(Debug, Clone)]
pub struct Batch {
    /// 批次序号（从 0 开始）
    pub index: usize,
    pub targets: Vec<Target>,
}

impl Batch {
    /// 提交前读取的当前文本
    pub fn texts(&self) -> Vec<String> {
        self.targets.iter().map(Target::get).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// 是否值得调用后端：至少一条文本达到最小长度
pub fn has_translatable_text(texts: &[String], filter: &TextFilter) -> bool {
    texts.iter().any(|text| filter.is_long_enough(text))
}

/// 顺序切分；`max_batch_size` 为 0 时按 1 处理
pub fn partition(targets: Vec<Target>, max_batch_size: usize) -> Vec<Batch> {
    let size = max_batch_size.max(1);
    let mut batches = Vec::with_capacity(targets.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for target in targets {
        current.push(target);
        if current.len() == size {
            batches.push(Batch {
                index: batches.len(),
                targets: std::mem::replace(&mut current, Vec::with_capacity(size)),
            });
        }
    }
    if !current.is_empty() {
        batches.push(Batch {
            index: batches.len(),
            targets: current,
        });
    }
    batches
}

/// 一次批量翻译的结果汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 切分出的批次数
    pub batches: usize,
    /// 实际调用后端的次数
    pub calls: usize,
    /// 成功写回的目标数
    pub applied: usize,
    /// 后端报错的批次数
    pub failed_batches: usize,
    /// 返回条数不一致而被丢弃的批次数
    pub mismatched_batches: usize,
    /// 引擎忙，本次调用被跳过
    pub skipped: bool,
}

impl BatchReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.skipped && self.failed_batches == 0 && self.mismatched_batches == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "批次 {}, 调用 {}, 写回 {}, 失败 {}, 条数不符 {}",
            self.batches, self.calls, self.applied, self.failed_batches, self.mismatched_batches
        )
    }
}
