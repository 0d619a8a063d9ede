//! 字段级校验管道
//!
//! 以链式调用的方式逐个字段累积校验结果：
//!
//! ```ignore
//! let outcome = Validator::new()
//!     .field("id", id).required().max_len(50)
//!     .field("settings", settings).valid_json()
//!     .finish();
//! ```
//!
//! 同一字段上第一个失败的检查会短路该字段后续的检查，但不影响其他字段，
//! 因此一次调用即可拿到所有字段的错误。产出的 `ValidationOutcome` 不可变，
//! 通过 `then` 组合多个阶段（前一阶段失败时后一阶段不会执行）。

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 内置检查使用的错误码
pub mod codes {
    pub const FIELD_REQUIRED: &str = "FIELD_REQUIRED";
    pub const STRING_TOO_LONG: &str = "STRING_TOO_LONG";
    pub const STRING_NOT_MATCH: &str = "STRING_NOT_MATCH";
    pub const INVALID_PAYLOAD: &str = "INVALID_PAYLOAD";
}

/// 单个字段错误：(字段上下文, 错误码)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub context: String,
    pub code: String,
}

impl FieldError {
    pub fn new(context: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.code)
    }
}

/// 校验结果
///
/// 没有错误即为成功；错误按产生顺序保存。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    errors: Vec<FieldError>,
}

impl ValidationOutcome {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(context: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(context, code)],
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// 是否包含指定字段上下文的错误
    pub fn has_error_for(&self, context: &str) -> bool {
        self.errors.iter().any(|e| e.context == context)
    }

    /// 是否包含指定错误码
    pub fn has_error_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// 成功时执行下一阶段校验，失败时原样返回当前结果
    pub fn then(self, next: impl FnOnce() -> ValidationOutcome) -> ValidationOutcome {
        if self.is_success() { next() } else { self }
    }

    /// 成功时执行副作用（通常是状态变更），失败时什么都不做
    pub fn if_success(self, apply: impl FnOnce()) -> Self {
        if self.is_success() {
            apply();
        }
        self
    }

    /// 成功时构造值，失败时返回错误集合
    pub fn into_result<T>(self, build: impl FnOnce() -> T) -> Result<T, ValidationOutcome> {
        if self.is_success() {
            Ok(build())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "validation succeeded");
        }
        let joined = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "validation failed: {joined}")
    }
}

impl std::error::Error for ValidationOutcome {}

// ---------------------------------------------------------------------------
// 值特征
// ---------------------------------------------------------------------------

/// 可判断"是否存在"的值（非空、非纯空白）
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for &str {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<T: Presence> Presence for Option<T> {
    fn is_present(&self) -> bool {
        self.as_ref().is_some_and(|v| v.is_present())
    }
}

/// 可作为文本参与长度/正则检查的值，`None` 表示缺省（检查直接通过）
pub trait TextValue {
    fn text(&self) -> Option<&str>;
}

impl TextValue for &str {
    fn text(&self) -> Option<&str> {
        Some(*self)
    }
}

impl TextValue for String {
    fn text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl TextValue for Option<&str> {
    fn text(&self) -> Option<&str> {
        *self
    }
}

/// 字符串是否为语法合法的 JSON 文档（不做 schema 校验）
pub fn is_valid_json(raw: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(raw).is_ok()
}

// ---------------------------------------------------------------------------
// 链式校验器
// ---------------------------------------------------------------------------

/// 校验入口
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始校验一个字段
    pub fn field<V>(self, context: &'static str, value: V) -> FieldCheck<V> {
        FieldCheck {
            errors: self.errors,
            context,
            value,
            halted: false,
        }
    }

    /// 在已有结果之上继续追加字段检查
    pub fn resume(outcome: ValidationOutcome) -> Self {
        Self {
            errors: outcome.errors,
        }
    }

    pub fn finish(self) -> ValidationOutcome {
        ValidationOutcome {
            errors: self.errors,
        }
    }
}

impl From<ValidationOutcome> for Validator {
    fn from(outcome: ValidationOutcome) -> Self {
        Self::resume(outcome)
    }
}

/// 针对单个字段的检查链
///
/// `halted` 为 true 时本字段剩余检查全部跳过。
#[derive(Debug)]
pub struct FieldCheck<V> {
    errors: Vec<FieldError>,
    context: &'static str,
    value: V,
    halted: bool,
}

impl<V> FieldCheck<V> {
    /// 切换到下一个字段
    pub fn field<W>(self, context: &'static str, value: W) -> FieldCheck<W> {
        FieldCheck {
            errors: self.errors,
            context,
            value,
            halted: false,
        }
    }

    pub fn finish(self) -> ValidationOutcome {
        ValidationOutcome {
            errors: self.errors,
        }
    }

    /// 任意谓词检查
    pub fn condition(mut self, predicate: impl FnOnce(&V) -> bool, code: &str) -> Self {
        if !self.halted && !predicate(&self.value) {
            self.errors.push(FieldError::new(self.context, code));
            self.halted = true;
        }
        self
    }

    pub fn equal_to(self, expected: V, code: &str) -> Self
    where
        V: PartialEq,
    {
        self.condition(|v| *v == expected, code)
    }

    /// 值必须属于允许集合
    pub fn one_of(self, allowed: &[V], code: &str) -> Self
    where
        V: PartialEq,
    {
        self.condition(|v| allowed.contains(v), code)
    }

    pub fn at_most(self, bound: V, code: &str) -> Self
    where
        V: PartialOrd,
    {
        self.condition(|v| *v <= bound, code)
    }
}

impl<V: Presence> FieldCheck<V> {
    pub fn required(self) -> Self {
        self.condition(|v| v.is_present(), codes::FIELD_REQUIRED)
    }
}

impl<V: TextValue> FieldCheck<V> {
    /// 最大字符数（按 Unicode 字符计）
    pub fn max_len(self, max: usize) -> Self {
        self.condition(
            |v| v.text().is_none_or(|s| s.chars().count() <= max),
            codes::STRING_TOO_LONG,
        )
    }

    pub fn matches(self, pattern: &Regex) -> Self {
        self.condition(
            |v| v.text().is_none_or(|s| pattern.is_match(s)),
            codes::STRING_NOT_MATCH,
        )
    }
}

impl<V: Presence + TextValue> FieldCheck<V> {
    /// 必填且为语法合法的 JSON
    pub fn valid_json(self) -> Self {
        self.required().condition(
            |v| v.text().is_some_and(is_valid_json),
            codes::INVALID_PAYLOAD,
        )
    }
}
