pub mod chat_judge;
pub mod constant;

pub use chat_judge::ChatJudgeEvaluator;
pub use constant::ConstantEvaluator;
