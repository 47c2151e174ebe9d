use crate::autodiff::jacobian;
use crate::traits::{DynamicalSystem, OdeSystem, StepOutcome, Steppable, Tolerance};
use nalgebra::{DMatrix, DVector};

fn eval(system: &impl OdeSystem, t: f64, x: &[f64], out: &mut [f64]) {
    DynamicalSystem::<f64>::apply(system, t, x, out);
}

/// Classic Runge-Kutta 4th Order Solver
///
/// Fixed step; reports a zero error norm so every attempt is accepted.
pub struct RK4 {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    tmp: Vec<f64>,
    pub evaluations: usize,
}

impl RK4 {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![0.0; dim],
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            tmp: vec![0.0; dim],
            evaluations: 0,
        }
    }
}

impl Steppable for RK4 {
    fn attempt(
        &mut self,
        system: &impl OdeSystem,
        t: f64,
        state: &[f64],
        dt: f64,
        _tolerance: &Tolerance,
        next: &mut [f64],
    ) -> StepOutcome {
        let n = state.len();

        // k1 = f(t, y)
        eval(system, t, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..n {
            self.tmp[i] = state[i] + 0.5 * dt * self.k1[i];
        }
        eval(system, t + 0.5 * dt, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..n {
            self.tmp[i] = state[i] + 0.5 * dt * self.k2[i];
        }
        eval(system, t + 0.5 * dt, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..n {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        eval(system, t + dt, &self.tmp, &mut self.k4);
        self.evaluations += 4;

        for i in 0..n {
            next[i] = state[i]
                + dt / 6.0 * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
        }

        StepOutcome {
            error_norm: 0.0,
            estimator_order: 4,
        }
    }
}

// Tsitouras (2011) 5(4) tableau.
const C2: f64 = 0.161;
const C3: f64 = 0.327;
const C4: f64 = 0.9;
const C5: f64 = 0.9800255409045097;

const A21: f64 = 0.161;
const A31: f64 = -0.008480655492356989;
const A32: f64 = 0.335480655492357;
const A41: f64 = 2.898;
const A42: f64 = -6.359447987781783;
const A43: f64 = 4.361447987781783;
const A51: f64 = 5.325864858437957;
const A52: f64 = -11.748883564062828;
const A53: f64 = 7.495539342889693;
const A54: f64 = -0.09249506636030195;
const A61: f64 = 5.86145544294642;
const A62: f64 = -12.92096931784711;
const A63: f64 = 8.159367898576159;
const A64: f64 = -0.071584973281401;
const A65: f64 = -0.02826857949054663;
const A71: f64 = 0.09646076681806523;
const A72: f64 = 0.01;
const A73: f64 = 0.4798896504144996;
const A74: f64 = 1.379008574103742;
const A75: f64 = -3.290069515436099;
const A76: f64 = 2.324710524099774;

// Difference between the 5th and embedded 4th order weights.
const E1: f64 = -0.00178001105222577714;
const E2: f64 = -0.0008164344596567469;
const E3: f64 = 0.007880878010261995;
const E4: f64 = -0.1447110071732629;
const E5: f64 = 0.5823571654525552;
const E6: f64 = -0.45808210592918697;
const E7: f64 = 0.015151515151515152;

/// Adaptive Tsitouras 5/4 Solver
///
/// First-same-as-last: the final stage of an accepted step is the first
/// stage of the next one. Each attempt also records `h·ρ`, an estimate of
/// the step size times the dominant Jacobian eigenvalue, taken from the two
/// stages evaluated at `t + dt`.
pub struct Tsit5 {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    k7: Vec<f64>,
    tmp: Vec<f64>,
    stage6: Vec<f64>,
    error: Vec<f64>,
    fsal: bool,
    stiffness: f64,
    pub evaluations: usize,
}

impl Tsit5 {
    /// Product `h·ρ` above which the explicit method is stability-limited.
    pub const STABILITY_BOUNDARY: f64 = 3.5068;

    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![0.0; dim],
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            k5: vec![0.0; dim],
            k6: vec![0.0; dim],
            k7: vec![0.0; dim],
            tmp: vec![0.0; dim],
            stage6: vec![0.0; dim],
            error: vec![0.0; dim],
            fsal: false,
            stiffness: 0.0,
            evaluations: 0,
        }
    }

    /// `h·ρ` from the most recent attempt.
    pub fn stiffness_estimate(&self) -> f64 {
        self.stiffness
    }
}

impl Steppable for Tsit5 {
    fn attempt(
        &mut self,
        system: &impl OdeSystem,
        t: f64,
        state: &[f64],
        dt: f64,
        tolerance: &Tolerance,
        next: &mut [f64],
    ) -> StepOutcome {
        let n = state.len();

        if !self.fsal {
            eval(system, t, state, &mut self.k1);
            self.evaluations += 1;
            self.fsal = true;
        }

        for i in 0..n {
            self.tmp[i] = state[i] + dt * A21 * self.k1[i];
        }
        eval(system, t + C2 * dt, &self.tmp, &mut self.k2);

        for i in 0..n {
            self.tmp[i] = state[i] + dt * (A31 * self.k1[i] + A32 * self.k2[i]);
        }
        eval(system, t + C3 * dt, &self.tmp, &mut self.k3);

        for i in 0..n {
            self.tmp[i] =
                state[i] + dt * (A41 * self.k1[i] + A42 * self.k2[i] + A43 * self.k3[i]);
        }
        eval(system, t + C4 * dt, &self.tmp, &mut self.k4);

        for i in 0..n {
            self.tmp[i] = state[i]
                + dt * (A51 * self.k1[i] + A52 * self.k2[i] + A53 * self.k3[i] + A54 * self.k4[i]);
        }
        eval(system, t + C5 * dt, &self.tmp, &mut self.k5);

        for i in 0..n {
            self.stage6[i] = state[i]
                + dt * (A61 * self.k1[i]
                    + A62 * self.k2[i]
                    + A63 * self.k3[i]
                    + A64 * self.k4[i]
                    + A65 * self.k5[i]);
        }
        eval(system, t + dt, &self.stage6, &mut self.k6);

        for i in 0..n {
            next[i] = state[i]
                + dt * (A71 * self.k1[i]
                    + A72 * self.k2[i]
                    + A73 * self.k3[i]
                    + A74 * self.k4[i]
                    + A75 * self.k5[i]
                    + A76 * self.k6[i]);
        }
        eval(system, t + dt, next, &mut self.k7);
        self.evaluations += 6;

        for i in 0..n {
            self.error[i] = dt
                * (E1 * self.k1[i]
                    + E2 * self.k2[i]
                    + E3 * self.k3[i]
                    + E4 * self.k4[i]
                    + E5 * self.k5[i]
                    + E6 * self.k6[i]
                    + E7 * self.k7[i]);
        }

        let mut dk = 0.0;
        let mut dy = 0.0;
        for i in 0..n {
            dk += (self.k7[i] - self.k6[i]).powi(2);
            dy += (next[i] - self.stage6[i]).powi(2);
        }
        self.stiffness = if dy > 0.0 {
            dt.abs() * (dk / dy).sqrt()
        } else {
            0.0
        };

        StepOutcome {
            error_norm: tolerance.error_norm(&self.error, state, next),
            estimator_order: 4,
        }
    }

    fn accept(&mut self) {
        std::mem::swap(&mut self.k1, &mut self.k7);
    }

    fn reset(&mut self) {
        self.fsal = false;
    }
}

/// Rosenbrock 2(3) solver of Shampine and Reichelt.
///
/// Linearly implicit and L-stable: each step factors `W = I − h·d·J` once
/// and reuses it for all three stages. The Jacobian comes from dual-number
/// sweeps over the system. Assumes an autonomous right-hand side, which all
/// epidemic systems are.
pub struct Rosenbrock23 {
    f0: Vec<f64>,
    f1: Vec<f64>,
    f2: Vec<f64>,
    tmp: Vec<f64>,
    error: Vec<f64>,
    jacobian: Option<DMatrix<f64>>,
    fsal: bool,
    pub evaluations: usize,
    pub jacobian_evaluations: usize,
    pub factorizations: usize,
}

impl Rosenbrock23 {
    const D: f64 = 0.2928932188134524; // 1 / (2 + √2)
    const E32: f64 = 7.414213562373095; // 6 + √2

    pub fn new(dim: usize) -> Self {
        Self {
            f0: vec![0.0; dim],
            f1: vec![0.0; dim],
            f2: vec![0.0; dim],
            tmp: vec![0.0; dim],
            error: vec![0.0; dim],
            jacobian: None,
            fsal: false,
            evaluations: 0,
            jacobian_evaluations: 0,
            factorizations: 0,
        }
    }

    /// Infinity norm of the Jacobian at the last step start, if one was built.
    pub fn jacobian_norm(&self) -> Option<f64> {
        self.jacobian.as_ref().map(|j| {
            j.row_iter()
                .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
                .fold(0.0, f64::max)
        })
    }
}

impl Steppable for Rosenbrock23 {
    fn attempt(
        &mut self,
        system: &impl OdeSystem,
        t: f64,
        state: &[f64],
        dt: f64,
        tolerance: &Tolerance,
        next: &mut [f64],
    ) -> StepOutcome {
        let n = state.len();
        let rejected = StepOutcome {
            error_norm: f64::INFINITY,
            estimator_order: 2,
        };

        if !self.fsal {
            eval(system, t, state, &mut self.f0);
            self.evaluations += 1;
            self.fsal = true;
        }
        if self.jacobian.is_none() {
            self.jacobian = Some(jacobian(system, t, state));
            self.jacobian_evaluations += 1;
        }
        let jac = match &self.jacobian {
            Some(j) => j,
            None => return rejected,
        };

        let w = DMatrix::<f64>::identity(n, n) - jac * (dt * Self::D);
        let lu = w.lu();
        self.factorizations += 1;
        let solve = |rhs: &[f64]| -> Option<Vec<f64>> {
            lu.solve(&DVector::from_column_slice(rhs))
                .map(|v| v.iter().copied().collect())
        };

        let k1 = match solve(&self.f0[..]) {
            Some(k) => k,
            None => return rejected,
        };

        for i in 0..n {
            self.tmp[i] = state[i] + 0.5 * dt * k1[i];
        }
        eval(system, t + 0.5 * dt, &self.tmp, &mut self.f1);

        for i in 0..n {
            self.tmp[i] = self.f1[i] - k1[i];
        }
        let mut k2 = match solve(&self.tmp[..]) {
            Some(k) => k,
            None => return rejected,
        };
        for i in 0..n {
            k2[i] += k1[i];
            next[i] = state[i] + dt * k2[i];
        }
        eval(system, t + dt, next, &mut self.f2);

        for i in 0..n {
            self.tmp[i] = self.f2[i]
                - Self::E32 * (k2[i] - self.f1[i])
                - 2.0 * (k1[i] - self.f0[i]);
        }
        let k3 = match solve(&self.tmp[..]) {
            Some(k) => k,
            None => return rejected,
        };
        self.evaluations += 2;

        for i in 0..n {
            self.error[i] = dt / 6.0 * (k1[i] - 2.0 * k2[i] + k3[i]);
        }

        StepOutcome {
            error_norm: tolerance.error_norm(&self.error, state, next),
            estimator_order: 2,
        }
    }

    fn accept(&mut self) {
        std::mem::swap(&mut self.f0, &mut self.f2);
        self.jacobian = None;
    }

    fn reset(&mut self) {
        self.fsal = false;
        self.jacobian = None;
    }
}
