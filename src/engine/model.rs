// ==========================================
// 班组排班优化系统 - 线性规划模型表示
// ==========================================
// 职责: 与求解器无关的 ILP 模型（变量/约束/目标）
// 说明: 模型构建器只产出该结构，求解后端负责翻译
// ==========================================

use std::fmt;

/// 变量句柄（模型内下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 变量定义域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDomain {
    /// 0/1 整数
    Binary,
    /// 连续（松弛变量）
    Continuous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub domain: VarDomain,
    pub lower: f64,
    pub upper: f64,
}

impl VarDef {
    /// 上下界相等即为固定变量
    pub fn is_fixed(&self) -> bool {
        (self.upper - self.lower).abs() < f64::EPSILON
    }
}

/// 约束方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Le => write!(f, "<="),
            Sense::Ge => write!(f, ">="),
            Sense::Eq => write!(f, "=="),
        }
    }
}

/// 线性约束 Σ coef·x (sense) rhs
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    /// 给定取值下是否满足（容差 1e-6）
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        let lhs: f64 = self
            .terms
            .iter()
            .map(|(var, coef)| coef * values.get(var.index()).copied().unwrap_or(0.0))
            .sum();
        match self.sense {
            Sense::Le => lhs <= self.rhs + 1e-6,
            Sense::Ge => lhs >= self.rhs - 1e-6,
            Sense::Eq => (lhs - self.rhs).abs() <= 1e-6,
        }
    }
}

// ==========================================
// Model - 最大化目标的 ILP 模型
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct Model {
    vars: Vec<VarDef>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<(VarId, f64)>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_var(&mut self, name: String, domain: VarDomain, lower: f64, upper: f64) -> VarId {
        self.vars.push(VarDef {
            name,
            domain,
            lower,
            upper,
        });
        VarId(self.vars.len() - 1)
    }

    /// 新增 0/1 变量
    pub fn add_bool(&mut self, name: impl Into<String>) -> VarId {
        self.add_var(name.into(), VarDomain::Binary, 0.0, 1.0)
    }

    /// 新增 [0, upper] 连续松弛变量
    pub fn add_slack(&mut self, name: impl Into<String>, upper: f64) -> VarId {
        self.add_var(name.into(), VarDomain::Continuous, 0.0, upper)
    }

    /// 固定变量取值（上下界同设）
    pub fn fix(&mut self, var: VarId, value: f64) {
        let def = &mut self.vars[var.0];
        def.lower = value;
        def.upper = value;
    }

    pub fn var(&self, var: VarId) -> &VarDef {
        &self.vars[var.0]
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        sense: Sense,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            terms,
            sense,
            rhs,
        });
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// 目标函数累加一项（同一变量可多次累加）
    pub fn add_objective_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.objective.push((var, coef));
        }
    }

    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// 给定取值的目标值
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|(var, coef)| coef * values.get(var.index()).copied().unwrap_or(0.0))
            .sum()
    }
}

// ==========================================
// Assignment - 求解结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assignment {
    values: Vec<f64>,
}

impl Assignment {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    /// 0/1 变量取整判断
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_bookkeeping() {
        let mut model = Model::new();
        let a = model.add_bool("a");
        let b = model.add_bool("b");
        let s = model.add_slack("s", 1.0);
        model.fix(a, 1.0);
        model.add_constraint("a_or_b", vec![(a, 1.0), (b, 1.0)], Sense::Le, 1.0);
        model.add_objective_term(b, 2.0);
        model.add_objective_term(s, -10.0);
        model.add_objective_term(a, 0.0);

        assert_eq!(model.num_vars(), 3);
        assert_eq!(model.num_constraints(), 1);
        assert!(model.var(a).is_fixed());
        assert!(!model.var(b).is_fixed());
        assert_eq!(model.var(s).domain, VarDomain::Continuous);
        assert_eq!(model.objective().len(), 2);

        let values = [1.0, 0.0, 0.0];
        assert!(model.constraints()[0].is_satisfied(&values));
        assert!(!model.constraints()[0].is_satisfied(&[1.0, 1.0, 0.0]));
        assert_eq!(model.objective_value(&[1.0, 1.0, 0.5]), -3.0);

        let assignment = Assignment::new(values.to_vec());
        assert!(assignment.is_set(a));
        assert!(!assignment.is_set(b));
    }
}
