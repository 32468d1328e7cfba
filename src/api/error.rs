// ==========================================
// 班组排班优化系统 - API层错误类型
// ==========================================
// 职责: 将 Repository / Engine 错误转换为调用方可读的错误
// 说明: 额度与日期范围拒绝不走错误通道，由 ClaimReply 返回
// ==========================================

use crate::domain::codec::CodecError;
use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 业务规则错误 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ===== 求解结果 =====
    #[error("求解失败: {0}")]
    SolverFailure(String),

    // ===== 并发控制错误 =====
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ===== 数据访问错误 =====
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                record,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "台账{}已被其他请求修改（期望revision={}，实际revision={}）",
                record, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}({})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Codec(e) => e.into(),
            EngineError::Repository(e) => e.into(),
            EngineError::QuotaExceeded { .. } | EngineError::DateRangeInvalid { .. } => {
                ApiError::BusinessRuleViolation(err.to_string())
            }
            EngineError::NoCoverageAvailable { .. } => ApiError::BusinessRuleViolation(err.to_string()),
            EngineError::InvalidWindow(msg) => ApiError::InvalidInput(msg),
            EngineError::SolverFeasibleOnly
            | EngineError::SolverInfeasible
            | EngineError::SolverUnbounded
            | EngineError::SolverNotSolved => ApiError::SolverFailure(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_conversion() {
        let err: ApiError = RepositoryError::OptimisticLockFailure {
            record: "worker=1, week=2026-W42".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(err, ApiError::OptimisticLockFailure(msg) if msg.contains("2026-W42")));

        let err: ApiError = RepositoryError::NotFound {
            entity: "Roster".to_string(),
            id: "worker=9".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_engine_conversion() {
        let err: ApiError = EngineError::SolverInfeasible.into();
        assert!(matches!(err, ApiError::SolverFailure(_)));

        let err: ApiError = EngineError::Codec(CodecError::LengthMismatch { left: 21, right: 7 }).into();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
