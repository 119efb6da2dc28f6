//! Latent-time assignment onto the two-branch trajectory.
//!
//! Purpose
//! -------
//! Map every observation onto the analytic trajectory, producing the
//! per-observation triple `(t, tau, on)`: absolute trajectory time,
//! branch-local time, and the branch indicator (true = induction, false =
//! repression). Two modes are supported, selected by configuration:
//!
//! - [`AssignmentMode::Projection`]: orthogonal projection onto a dense grid
//!   of points along each branch, choosing the nearest curve point.
//! - [`AssignmentMode::InverseApprox`]: the closed-form inverse of the
//!   trajectory, clipped to the valid branch range.
//!
//! Branch membership is decided by the smaller squared residual against the
//! two branch candidates. When explicit steady states are enabled, the upper
//! steady point and the basal point compete as well: observations closest to
//! them pin to the switch time and to the end of the repression branch.
//!
//! Conventions
//! -----------
//! - The unspliced coordinate passed in is already divided by the scaling
//!   factor; both coordinates live in spliced units here.
//! - `t = tau` on the induction branch and `t = t_ + tau` on the repression
//!   branch.
//! - This module is purely numeric; no I/O, no logging.

use ndarray::Array1;

use crate::kinetics::core::trajectory::{inv, mrna, mrna_curve, tau_inv, tau_inv_u};

/// Grid bounds for the projection mode: one point per five observations,
/// clamped to this range per branch.
const PROJECTION_GRID_MIN: usize = 200;
const PROJECTION_GRID_MAX: usize = 500;

/// How observation times are assigned to the trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentMode {
    /// Orthogonal projection onto a dense two-branch curve grid.
    Projection,
    /// Closed-form inverse of the trajectory, clipped to branch range.
    InverseApprox,
}

/// Per-observation latent-time assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAssignment {
    /// Absolute trajectory time per observation.
    pub t: Array1<f64>,
    /// Branch-local time per observation.
    pub tau: Array1<f64>,
    /// Branch indicator: true = induction, false = repression.
    pub on: Array1<bool>,
}

impl TimeAssignment {
    /// Placeholder assignment of all-zero times on the induction branch.
    pub fn zeros(n: usize) -> Self {
        TimeAssignment {
            t: Array1::zeros(n),
            tau: Array1::zeros(n),
            on: Array1::from_elem(n, true),
        }
    }

    /// True when any observation currently sits on the induction branch.
    pub fn any_on(&self) -> bool {
        self.on.iter().any(|&b| b)
    }
}

/// The trajectory geometry a candidate parameter set induces.
///
/// `alpha_` is the basal production rate active on the repression branch;
/// `(u0, s0)` are the basal initial conditions (the origin unless basal
/// transcription is modeled).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryShape {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub t_: f64,
    pub alpha_: f64,
    pub u0: f64,
    pub s0: f64,
}

impl TrajectoryShape {
    /// Expression reached at the switching event, the repression branch's
    /// initial condition.
    pub fn switch_state(&self) -> (f64, f64) {
        mrna(self.t_, self.u0, self.s0, self.alpha, self.beta, self.gamma)
    }
}

/// Candidate branch-local times for every observation on both branches,
/// plus the repression-branch range cap.
struct BranchTimes {
    tau_on: Array1<f64>,
    tau_off: Array1<f64>,
    off_cap: f64,
}

fn branch_times_inner(
    u: &Array1<f64>, s: &Array1<f64>, shape: &TrajectoryShape, mode: AssignmentMode,
) -> BranchTimes {
    let n = u.len();
    let (u0_, s0_) = shape.switch_state();

    match mode {
        AssignmentMode::InverseApprox => {
            let tau_on = Array1::from_iter((0..n).map(|i| {
                tau_inv(u[i], s[i], shape.u0, shape.s0, shape.alpha, shape.beta, shape.gamma)
                    .clamp(0.0, shape.t_)
            }));
            let raw_off = Array1::from_iter((0..n).map(|i| {
                tau_inv(u[i], s[i], u0_, s0_, shape.alpha_, shape.beta, shape.gamma).max(0.0)
            }));
            let off_cap = (0..n)
                .filter(|&i| s[i] > 0.0)
                .map(|i| raw_off[i])
                .fold(0.0_f64, f64::max);
            let tau_off = raw_off.mapv(|t| t.min(off_cap));
            BranchTimes { tau_on, tau_off, off_cap }
        }
        AssignmentMode::Projection => {
            let num = (n / 5).clamp(PROJECTION_GRID_MIN, PROJECTION_GRID_MAX);

            // Repression branch extends until the smallest observed unspliced
            // level would be reached by pure decay from the switch state.
            let u_floor = (0..n)
                .filter(|&i| s[i] > 0.0)
                .map(|i| u[i])
                .fold(f64::INFINITY, f64::min);
            let u_floor = if u_floor.is_finite() {
                u_floor
            } else {
                let overall = u.iter().copied().fold(f64::INFINITY, f64::min);
                if overall.is_finite() { overall } else { 0.0 }
            };
            let mut off_end = tau_inv_u(u_floor, u0_, shape.alpha_, shape.beta);
            if !off_end.is_finite() || off_end <= 0.0 {
                off_end = shape.t_;
            }

            let grid_on = Array1::linspace(0.0, shape.t_, num);
            let grid_off_full = Array1::linspace(0.0, off_end, num);
            // Drop the duplicate switch point at the start of the off grid.
            let grid_off = grid_off_full.slice(ndarray::s![1..]).to_owned();

            let (cu_on, cs_on) =
                mrna_curve(&grid_on, shape.u0, shape.s0, shape.alpha, shape.beta, shape.gamma);
            let (cu_off, cs_off) =
                mrna_curve(&grid_off, u0_, s0_, shape.alpha_, shape.beta, shape.gamma);

            let nearest = |ui: f64, si: f64, cu: &Array1<f64>, cs: &Array1<f64>| -> usize {
                let mut best = 0;
                let mut best_d = f64::INFINITY;
                for k in 0..cu.len() {
                    let du = cu[k] - ui;
                    let ds = cs[k] - si;
                    let d = du * du + ds * ds;
                    if d < best_d {
                        best_d = d;
                        best = k;
                    }
                }
                best
            };

            let tau_on =
                Array1::from_iter((0..n).map(|i| grid_on[nearest(u[i], s[i], &cu_on, &cs_on)]));
            let tau_off =
                Array1::from_iter((0..n).map(|i| grid_off[nearest(u[i], s[i], &cu_off, &cs_off)]));
            BranchTimes { tau_on, tau_off, off_cap: off_end }
        }
    }
}

/// Assign `(t, tau, on)` to every observation.
///
/// Parameters
/// ----------
/// - `u`, `s`: observed coordinates, with `u` already in spliced units
///   (divided by the scaling factor).
/// - `shape`: candidate trajectory geometry.
/// - `mode`: projection or inverse-formula assignment.
/// - `fit_steady_states`: when true, the upper steady point and the basal
///   point compete with the transient branches as assignment targets.
pub fn assign_time(
    u: &Array1<f64>, s: &Array1<f64>, shape: &TrajectoryShape, mode: AssignmentMode,
    fit_steady_states: bool,
) -> TimeAssignment {
    let n = u.len();
    let (u0_, s0_) = shape.switch_state();
    let times = branch_times_inner(u, s, shape, mode);

    let u_inf = shape.alpha * inv(shape.beta);
    let s_inf = shape.alpha * inv(shape.gamma);

    let mut t = Array1::zeros(n);
    let mut tau = Array1::zeros(n);
    let mut on = Array1::from_elem(n, true);

    for i in 0..n {
        let (ut_on, st_on) = mrna(
            times.tau_on[i], shape.u0, shape.s0, shape.alpha, shape.beta, shape.gamma,
        );
        let (ut_off, st_off) = mrna(times.tau_off[i], u0_, s0_, shape.alpha_, shape.beta, shape.gamma);

        let d_on = (u[i] - ut_on).powi(2) + (s[i] - st_on).powi(2);
        let d_off = (u[i] - ut_off).powi(2) + (s[i] - st_off).powi(2);

        // Candidate order matters only for exact ties; the repression branch
        // wins those, keeping the assignment stable under tiny perturbations.
        let mut best = if d_on < d_off { 1 } else { 0 };
        let mut best_d = best_d_of(best, d_on, d_off);

        if fit_steady_states {
            let d_ss_on = (u[i] - u_inf).powi(2) + (s[i] - s_inf).powi(2);
            if d_ss_on < best_d {
                best = 2;
                best_d = d_ss_on;
            }
            let d_ss_off = (u[i] - shape.u0).powi(2) + (s[i] - shape.s0).powi(2);
            if d_ss_off < best_d {
                best = 3;
            }
        }

        match best {
            1 => {
                tau[i] = times.tau_on[i];
                t[i] = times.tau_on[i];
                on[i] = true;
            }
            0 => {
                tau[i] = times.tau_off[i];
                t[i] = shape.t_ + times.tau_off[i];
                on[i] = false;
            }
            2 => {
                tau[i] = shape.t_;
                t[i] = shape.t_;
                on[i] = true;
            }
            _ => {
                tau[i] = times.off_cap;
                t[i] = shape.t_ + times.off_cap;
                on[i] = false;
            }
        }
    }

    TimeAssignment { t, tau, on }
}

fn best_d_of(best: usize, d_on: f64, d_off: f64) -> f64 {
    if best == 1 { d_on } else { d_off }
}

/// Branch-local times of both branches for every observation, regardless of
/// the branch each observation is assigned to.
pub fn branch_times(
    u: &Array1<f64>, s: &Array1<f64>, shape: &TrajectoryShape, mode: AssignmentMode,
) -> (Array1<f64>, Array1<f64>) {
    let times = branch_times_inner(u, s, shape, mode);
    (times.tau_on, times.tau_off)
}

/// Derive `(t, tau, on)` from an existing absolute-time vector, splitting at
/// the switching time without re-assigning.
pub fn fixed_time_assignment(t: &Array1<f64>, t_: f64) -> TimeAssignment {
    let on = t.mapv(|ti| ti < t_);
    let tau = Array1::from_iter(t.iter().zip(on.iter()).map(|(&ti, &is_on)| {
        if is_on { ti } else { (ti - t_).max(0.0) }
    }));
    TimeAssignment { t: t.clone(), tau, on }
}
