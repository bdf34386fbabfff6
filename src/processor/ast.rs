//! Call tree for one script, produced by the parser and walked by entries.

use crate::model::Value;

/// One keyword invocation: `keyword args… { block }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub keyword: String,
    /// `w` in `w.host "x"`, naming the enclosing block's receiver.
    pub receiver: Option<String>,
    pub args: Vec<Value>,
    pub block: Option<Block>,
    /// Written as a lone identifier: no parentheses, arguments or block.
    pub bare: bool,
    pub line: usize,
}

impl Call {
    pub fn new(keyword: impl Into<String>, line: usize) -> Self {
        Self {
            keyword: keyword.into(),
            receiver: None,
            args: Vec::new(),
            block: None,
            bare: false,
            line,
        }
    }
}

/// Body of a `{ … }` or `do … end` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// `|w|` block parameter, if declared.
    pub param: Option<String>,
    pub body: Vec<Call>,
}

/// A whole script: its top-level calls in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub calls: Vec<Call>,
}
