// ==========================================
// 班组排班优化系统 - 引擎层
// ==========================================
// 职责: 模型构建、求解调度、缺勤处理
// 红线: Engine 不拼 SQL，台账读写经由 Repository
// ==========================================

pub mod clock;
pub mod disruption;
pub mod error;
pub mod fairness;
pub mod leave;
pub mod lp_backend;
pub mod model;
pub mod model_builder;
pub mod optimizer;
pub mod repositories;
pub mod solver;

// 重导出核心引擎
pub use clock::{Clock, FixedClock, SystemClock, APPLICATION_WEEK_OFFSET};
pub use disruption::{Cascade, DisruptionResolver, SicknessOutcome, Substitution, VacationOutcome};
pub use error::{EngineError, EngineResult};
pub use leave::{validate_claim_dates, ClaimWindow, LeaveRequest, WeekSegment};
pub use lp_backend::MicroLpBackend;
pub use model::{Assignment, Model};
pub use model_builder::{BuildParams, BuiltModel, RollingHorizonModelBuilder, WindowWorker};
pub use optimizer::{OptimizationReport, OptimizerController};
pub use repositories::RosterRepositories;
pub use solver::{SolveReport, SolverBackend, SolverGateway};
