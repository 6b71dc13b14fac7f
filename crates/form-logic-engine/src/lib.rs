//! 表单逻辑引擎
//!
//! 对一次表单提交做确定性的、沙箱化的计算：
//! - 按 schema 校验原始提交数据（fail-fast）
//! - 评估条件可见性规则，产出稀疏的可见性覆盖表
//! - 按顺序执行公式链，公式文本由受限解释器求值，永不执行任意代码
//!
//! 另外提供把三者串起来的提交流水线，以及发布前的表单定义静态检查。

pub mod checker;
pub mod cli;
pub mod coerce;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod formula;
pub mod models;
pub mod operators;
pub mod pipeline;
pub mod rules;
pub mod validator;

pub use checker::{CheckReport, DefinitionChecker, DefinitionIssue};
pub use error::{FormulaError, ValidationError};
pub use evaluator::ConditionEvaluator;
pub use expression::{EngineLimits, Number};
pub use formula::{FormulaEngine, WorkingEnvironment};
pub use models::{
    Action, ComputedData, Field, FieldOption, FieldType, FormDefinition, FormSchema, Formula,
    Page, Rule, SubmissionData, Trigger, VisibilityOverrides,
};
pub use operators::{Effect, Operator};
pub use pipeline::{PipelineOptions, ProcessedSubmission, SubmissionPipeline};
pub use rules::RuleEngine;
pub use validator::SchemaValidator;
