//! Per-gene kinetics recovery: the iterative fitting state machine.
//!
//! Purpose
//! -------
//! Own one gene's full fitting state and drive it through initialization,
//! candidate updates, and the staged simplex schedule. The model alternates
//! between latent-time assignment and parameter refinement: every candidate
//! the optimizer proposes is routed through [`KineticModel::update`], the
//! sole transition with authority over acceptance, so even non-converged
//! intermediate iterates can move the accepted state.
//!
//! Key behaviors
//! -------------
//! - [`KineticModel::initialize`]: moment-based starting estimates (scaling
//!   from std ratio, degradation rate from an upper-quantile regression, a
//!   bimodality screen for steady-state subpopulations, trajectory-inverted
//!   switching time) plus two scaling refinement passes.
//! - [`KineticModel::update`]: pure accept/reject transition with the
//!   switching-time extension heuristic that pulls the model out of the
//!   collapsed-switch local optimum.
//! - [`KineticModel::fit`]: the fixed five-stage schedule, each stage
//!   seeding a coarse grid then running a Nelder-Mead search whose every
//!   vertex flows through `update`; finished by a divergence, likelihood,
//!   and variance computation.
//!
//! Invariants & assumptions
//! ------------------------
//! - The accepted-loss trace is non-increasing except where the
//!   switching-time extension fires, and then the relative increase stays
//!   within the band fixed by [`SWITCH_EXTENSION_TOL`].
//! - Negative or non-finite candidate rates are rejected at resolution and
//!   reported to the optimizer as infinitely costly, never accepted.
//! - A gene flagged not recoverable is inert: `initialize` and `fit` return
//!   without touching the trace.
//! - With a zero iteration budget, `fit` leaves the parameters exactly as
//!   initialization produced them.
//!
//! Conventions
//! -----------
//! - The unspliced signal is compared in spliced units (divided by the
//!   scaling factor); residuals are standardized by the per-signal stds.
//! - Logging is confined to the initialization-time bimodality fallback;
//!   the numeric paths emit nothing.

use ndarray::Array1;

use crate::{
    kinetics::{
        core::{
            assignment::{
                AssignmentMode, TimeAssignment, TrajectoryShape, assign_time, branch_times,
                fixed_time_assignment,
            },
            data::{GeneProfile, masked, masked_slope, percentile},
            options::RecoveryOptions,
            params::{KineticParams, ParamUpdate},
            trace::FitTrace,
            trajectory::{mrna, tau_inv, unspliced},
        },
        errors::{KineticError, KineticResult},
    },
    optimization::{
        errors::{OptError, OptResult},
        simplex::{CandidateUpdate, SimplexOptions, minimize},
    },
    statistical_tests::bimodality::{BimodalityOutcome, DEFAULT_BINS},
};

/// Relative loss band of the switching-time extension: a stretched switch
/// is accepted only while `alt_loss * SWITCH_EXTENSION_TOL <= best_loss`,
/// bounding any loss increase to about 1%.
pub const SWITCH_EXTENSION_TOL: f64 = 0.99;

/// Significance threshold below which the bimodality screen marks a
/// detectable steady-state subpopulation.
const STEADY_PVAL_THRESHOLD: f64 = 1e-3;

/// Additive epsilon on the regressed degradation rate, avoiding the
/// degenerate `beta == gamma` case of the spliced solution.
const GAMMA_EPS: f64 = 1e-6;

/// Number of stages in the fitting schedule; the iteration budget is split
/// evenly across them.
const FIT_STAGES: usize = 5;

/// Cost-spread tolerance of the joint time/parameter stages.
const DEFAULT_SD_TOL: f64 = 1e-4;

/// Looser tolerance of the rates-dominated stages.
const RATES_SD_TOL: f64 = 1e-2;

/// Outcome of one update transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateOutcome {
    /// Whether the candidate (or its stretched-switch variant) replaced the
    /// accepted state.
    pub accepted: bool,
    /// Loss of the proposed candidate itself, `inf` for an out-of-domain
    /// candidate. This is the cost the optimizer sees.
    pub candidate_loss: f64,
}

/// A fully evaluated candidate state.
#[derive(Debug, Clone)]
struct Evaluation {
    params: KineticParams,
    assignment: TimeAssignment,
    u0_: f64,
    s0_: f64,
    loss: f64,
}

/// One gene's kinetic model state.
#[derive(Debug, Clone)]
pub struct KineticModel {
    profile: GeneProfile,
    options: RecoveryOptions,
    params: KineticParams,
    /// Basal production rate active on the repression branch.
    alpha_: f64,
    /// Basal initial conditions of the trajectory.
    u0: f64,
    s0: f64,
    /// Expression reached at the switching event.
    u0_: f64,
    s0_: f64,
    steady_u: f64,
    steady_s: f64,
    pval_steady: f64,
    steady_state_ratio: f64,
    assignment: TimeAssignment,
    /// Induction-branch times of all observations, filled by `fit`.
    branch_tau: Array1<f64>,
    /// Repression-branch times of all observations, filled by `fit`.
    branch_tau_: Array1<f64>,
    trace: FitTrace,
    likelihood: f64,
    varx: f64,
    assignment_mode: AssignmentMode,
    initialized: bool,
}

impl KineticModel {
    /// Build a model over one gene's signal pair.
    ///
    /// Degenerate input (constant-zero or near-empty signal) yields a model
    /// with `recoverable() == false` rather than an error; only malformed
    /// input (length mismatches, negative values) errors out.
    pub fn new(u: Array1<f64>, s: Array1<f64>, options: RecoveryOptions) -> KineticResult<Self> {
        Self::with_mask(u, s, None, options)
    }

    /// Build a model with a caller-supplied observation weight mask, which
    /// is intersected with the positivity mask before any estimation.
    pub fn with_mask(
        u: Array1<f64>, s: Array1<f64>, cell_mask: Option<&Array1<bool>>,
        options: RecoveryOptions,
    ) -> KineticResult<Self> {
        options.validate(u.len())?;
        let profile = GeneProfile::new(u, s, cell_mask)?;
        let n = profile.n_obs();

        let (alpha_, u0, s0) = if options.fit_basal_transcription {
            let u_min = profile.u.iter().copied().fold(f64::INFINITY, f64::min);
            let s_min = profile.s.iter().copied().fold(f64::INFINITY, f64::min);
            let u0 = if u_min.is_finite() { u_min } else { 0.0 };
            let s0 = if s_min.is_finite() { s_min } else { 0.0 };
            // Basal production sustaining the observed unspliced floor.
            (u0, u0, s0)
        } else {
            (0.0, 0.0, 0.0)
        };

        Ok(KineticModel {
            profile,
            options,
            params: KineticParams { alpha: 0.0, beta: 1.0, gamma: 0.0, t_: 1.0, scaling: 1.0 },
            alpha_,
            u0,
            s0,
            u0_: 0.0,
            s0_: 0.0,
            steady_u: 0.0,
            steady_s: 0.0,
            pval_steady: 1.0,
            steady_state_ratio: f64::NAN,
            assignment: TimeAssignment::zeros(n),
            branch_tau: Array1::zeros(n),
            branch_tau_: Array1::zeros(n),
            trace: FitTrace::new(),
            likelihood: f64::NAN,
            varx: f64::NAN,
            assignment_mode: AssignmentMode::InverseApprox,
            initialized: false,
        })
    }

    /// Compute moment-based starting estimates and seed the trace.
    ///
    /// No-op for a gene flagged not recoverable. See the module docs for the
    /// estimation recipe; a failing bimodality screen is substituted with
    /// neutral defaults and a warning instead of aborting the fit.
    pub fn initialize(&mut self) -> KineticResult<()> {
        if !self.profile.recoverable {
            return Ok(());
        }

        let w = &self.profile.weights;
        let u_w = masked(&self.profile.u, w);
        let s_w = masked(&self.profile.s, w);

        // Scaling between the signals, from their std ratio.
        let (std_u, std_s) = (self.profile.std_u, self.profile.std_s);
        let scaling = if std_u == 0.0 || std_s == 0.0 { 1.0 } else { std_u / std_s };
        let u_w: Vec<f64> = u_w.iter().map(|v| v / scaling).collect();

        // Upper-quantile subsets.
        let perc = self.options.percentile;
        let ub_u = percentile(&u_w, perc);
        let ub_s = percentile(&s_w, perc);
        let top_u: Vec<bool> = u_w.iter().map(|&v| v >= ub_u).collect();
        let top_s: Vec<bool> = s_w.iter().map(|&v| v >= ub_s).collect();

        // Steady subset for the degradation regression, optionally widened
        // by the caller's steady-state prior.
        let mut steady = top_s.clone();
        if let Some(prior) = &self.options.steady_state_prior {
            let prior_w: Vec<bool> = prior
                .iter()
                .zip(w.iter())
                .filter(|(_, &keep)| keep)
                .map(|(&p, _)| p)
                .collect();
            for (dst, &p) in steady.iter_mut().zip(prior_w.iter()) {
                *dst |= p;
            }
        }

        let beta = 1.0;
        let mut gamma =
            masked_slope(&u_w, &s_w, &steady) + GAMMA_EPS;
        // Nudge extreme ratios toward the scaling-consistent range so bad
        // starting points converge faster.
        if gamma < 0.05 / scaling {
            gamma *= 1.2;
        } else if gamma > 1.5 / scaling {
            gamma /= 1.2;
        }

        let top_either: Vec<bool> =
            top_u.iter().zip(top_s.iter()).map(|(&a, &b)| a || b).collect();
        let mut u_inf = mean_where(&u_w, &top_either);
        let s_inf = mean_where(&s_w, &top_s);
        let mut alpha = u_inf * beta;
        let mut beta = beta;
        let (mut u0_, mut s0_) = (u_inf, s_inf);

        // Bimodality screen on both signals; neutral defaults on failure.
        let bim_u = BimodalityOutcome::test_bimodality(&u_w, DEFAULT_BINS, true)
            .unwrap_or_else(|err| {
                log::warn!("skipping bimodality check for unspliced signal: {err}");
                BimodalityOutcome::neutral()
            });
        let bim_s = BimodalityOutcome::test_bimodality(&s_w, DEFAULT_BINS, true)
            .unwrap_or_else(|err| {
                log::warn!("skipping bimodality check for spliced signal: {err}");
                BimodalityOutcome::neutral()
            });
        self.pval_steady = bim_u.p_value().max(bim_s.p_value());
        self.steady_u = bim_u.means()[1];
        self.steady_s = bim_s.means()[1];

        // A detectable steady-state subpopulation blends into the boundary
        // estimates.
        if self.pval_steady < STEADY_PVAL_THRESHOLD {
            u_inf = 0.5 * (u_inf + self.steady_u);
            alpha = gamma * s_inf;
            if u_inf > 0.0 {
                beta = alpha / u_inf;
            }
            u0_ = u_inf;
            s0_ = s_inf;
        }

        // Switching time by inverting the trajectory at the boundary values.
        let mut t_ = tau_inv(u0_, s0_, self.u0, self.s0, alpha, beta, gamma);
        if !t_.is_finite() || t_ <= 0.0 {
            t_ = 1.0;
        }

        let params = KineticParams { alpha, beta, gamma, t_, scaling };
        params.validate()?;
        self.params = params;

        let eval = self.evaluate(&params, false)?;
        self.commit(eval, false);

        // Two keep-best refinement passes around the scaling estimate.
        self.refine_scaling(0.5)?;
        self.refine_scaling(0.1)?;

        self.steady_state_ratio = self.params.gamma / self.params.beta;
        self.initialized = true;
        Ok(())
    }

    /// Seed the model from previously persisted parameters instead of
    /// re-initializing, refreshing the time assignment once.
    pub fn seed_from(&mut self, params: KineticParams) -> KineticResult<()> {
        if !self.profile.recoverable {
            return Ok(());
        }
        params.validate()?;
        self.params = params;
        let eval = self.evaluate(&params, false)?;
        self.commit(eval, false);
        self.steady_state_ratio = self.params.gamma / self.params.beta;
        self.initialized = true;
        Ok(())
    }

    fn refine_scaling(&mut self, sight: f64) -> KineticResult<()> {
        if !self.options.fit_scaling {
            return Ok(());
        }
        let base = self.params.scaling;
        for k in 0..4 {
            let offset = -1.0 + 2.0 * k as f64 / 3.0;
            let z = base + offset * base * sight;
            let beta = self.params.beta / self.params.scaling * z;
            self.update(&ParamUpdate {
                scaling: Some(z),
                beta: Some(beta),
                ..ParamUpdate::default()
            })?;
        }
        Ok(())
    }

    /// Candidate transition: the sole operation with authority to change
    /// the accepted state.
    ///
    /// # Behavior
    /// - Resolves the candidate subset against the current state; invalid
    ///   values (negative rates, non-positive switch time or scaling) reject
    ///   immediately with an infinite candidate loss.
    /// - Re-assigns latent times (unless time is held fixed), evaluates the
    ///   weighted loss, and accepts iff it strictly undercuts the previous
    ///   accepted loss.
    /// - When observations sit on the induction branch and the extension
    ///   heuristic is enabled, a stretched switching time covering more of
    ///   those observations is evaluated as an alternative: a strictly
    ///   improving stretch is always taken, and a stretch whose loss stays
    ///   within the [`SWITCH_EXTENSION_TOL`] band is taken when the
    ///   unspliced level at the switch grows.
    /// - On acceptance the scaling-coupled steady level is rescaled, state
    ///   is replaced, and the trace is appended. Rejection changes nothing.
    ///
    /// # Returns
    /// The acceptance flag and the candidate's own loss (the optimizer's
    /// cost), independent of whether the stretched variant was taken.
    pub fn update(&mut self, upd: &ParamUpdate) -> KineticResult<UpdateOutcome> {
        let candidate = match upd.resolve(&self.params) {
            Ok(candidate) => candidate,
            Err(_) => {
                return Ok(UpdateOutcome { accepted: false, candidate_loss: f64::INFINITY });
            }
        };

        let loss_prev = self.trace.last_loss().unwrap_or(f64::INFINITY);
        let mut eval = self.evaluate(&candidate, upd.keep_time)?;
        let candidate_loss = eval.loss;
        let mut accepted = eval.loss < loss_prev;

        if upd.adjust_switch && self.options.fit_steady_states && self.assignment.any_on() {
            if !accepted {
                // Judge the extension from the current accepted state.
                eval = self.evaluate(&self.params.clone(), upd.keep_time)?;
            }
            if let Some(stretched) = self.switch_extension(&eval, upd.keep_time, loss_prev)? {
                eval = stretched;
                accepted = true;
            }
        }

        if accepted {
            self.commit(eval, upd.rescales());
        }
        Ok(UpdateOutcome { accepted, candidate_loss })
    }

    /// Evaluate the stretched-switch alternative of an accepted-or-candidate
    /// state. Returns the stretched evaluation when it qualifies.
    fn switch_extension(
        &self, eval: &Evaluation, keep_time: bool, loss_prev: f64,
    ) -> KineticResult<Option<Evaluation>> {
        let t = &eval.assignment.t;
        let on = &eval.assignment.on;
        let t_ = eval.params.t_;

        let mut alt_t_ = t
            .iter()
            .zip(on.iter())
            .filter(|(_, &is_on)| is_on)
            .map(|(&ti, _)| ti)
            .fold(0.0_f64, f64::max);
        if !(alt_t_ > 0.0 && alt_t_ < t_) {
            return Ok(None);
        }

        // Push past the tie mass sitting exactly at the switch.
        let n = t.len() as f64;
        let t_max = t.iter().copied().fold(0.0_f64, f64::max);
        let ties = t.iter().filter(|&&ti| ti == t_).count() as f64;
        alt_t_ += t_max / n * ties;

        let mut alt_params = eval.params;
        alt_params.t_ = alt_t_;
        if alt_params.validate().is_err() {
            return Ok(None);
        }
        let alt_eval = self.evaluate(&alt_params, keep_time)?;

        let ut_cur = unspliced(t_, self.u0, eval.params.alpha, eval.params.beta);
        let ut_alt = unspliced(alt_t_, self.u0, eval.params.alpha, eval.params.beta);
        let u_grows = ut_cur * SWITCH_EXTENSION_TOL < ut_alt;

        let min_loss = eval.loss.min(loss_prev);
        let within_band = alt_eval.loss * SWITCH_EXTENSION_TOL <= min_loss;

        // A strictly improving stretch always qualifies; a small loss
        // increase must stay inside the band AND grow the switch level.
        if within_band && (alt_eval.loss <= min_loss || u_grows) {
            Ok(Some(alt_eval))
        } else {
            Ok(None)
        }
    }

    fn commit(&mut self, eval: Evaluation, rescaled: bool) {
        if rescaled && eval.params.scaling != self.params.scaling {
            let ratio = self.params.scaling / eval.params.scaling;
            self.steady_u *= ratio;
        }
        self.u0_ = eval.u0_;
        self.s0_ = eval.s0_;
        self.assignment = eval.assignment;
        self.params = eval.params;
        self.trace.push(eval.params, eval.loss);
    }

    fn shape_for(&self, params: &KineticParams) -> TrajectoryShape {
        TrajectoryShape {
            alpha: params.alpha,
            beta: params.beta,
            gamma: params.gamma,
            t_: params.t_,
            alpha_: self.alpha_,
            u0: self.u0,
            s0: self.s0,
        }
    }

    fn evaluate(&self, params: &KineticParams, keep_time: bool) -> KineticResult<Evaluation> {
        let shape = self.shape_for(params);
        let u_scaled = self.profile.u.mapv(|v| v / params.scaling);
        let assignment = if keep_time || !self.options.fit_time {
            fixed_time_assignment(&self.assignment.t, params.t_)
        } else {
            assign_time(
                &u_scaled,
                &self.profile.s,
                &shape,
                self.assignment_mode,
                self.options.fit_steady_states,
            )
        };
        let (u0_, s0_) = shape.switch_state();
        let loss = self.loss_for(&u_scaled, &assignment, params, u0_, s0_)?;
        Ok(Evaluation { params: *params, assignment, u0_, s0_, loss })
    }

    /// Weighted mean squared residual of the assigned trajectory.
    fn loss_for(
        &self, u_scaled: &Array1<f64>, assignment: &TimeAssignment, params: &KineticParams,
        u0_: f64, s0_: f64,
    ) -> KineticResult<f64> {
        let std_u = if self.profile.std_u > 0.0 { self.profile.std_u } else { 1.0 };
        let std_s = if self.profile.std_s > 0.0 { self.profile.std_s } else { 1.0 };

        let mut sum = 0.0;
        let mut count = 0usize;
        for i in 0..self.profile.n_obs() {
            if !self.profile.weights[i] {
                continue;
            }
            let (ut, st) = if assignment.on[i] {
                mrna(
                    assignment.tau[i], self.u0, self.s0, params.alpha, params.beta, params.gamma,
                )
            } else {
                mrna(
                    assignment.tau[i], u0_, s0_, self.alpha_, params.beta, params.gamma,
                )
            };
            let udiff = (ut - u_scaled[i]) * params.scaling / std_u;
            let sdiff = (st - self.profile.s[i]) / std_s;
            sum += udiff * udiff + sdiff * sdiff;
            count += 1;
        }
        if count == 0 {
            return Ok(f64::INFINITY);
        }
        let loss = sum / count as f64;
        if loss.is_nan() {
            return Err(KineticError::NonFiniteLoss { value: loss });
        }
        Ok(loss)
    }

    /// Run the staged fitting schedule, then close out with divergence,
    /// likelihood, and variance.
    ///
    /// With a zero iteration budget only the closing refresh runs, leaving
    /// the initialization estimates untouched. A gene flagged not
    /// recoverable returns immediately.
    pub fn fit(&mut self) -> OptResult<()> {
        if !self.profile.recoverable {
            return Ok(());
        }
        if !self.initialized {
            return Err(OptError::from(KineticError::NotInitialized));
        }

        if self.options.max_iter > 0 {
            let iters = (self.options.max_iter / FIT_STAGES).max(1) as u64;

            self.fit_switch_and_alpha(iters)?;
            self.fit_scaling_stage(iters)?;
            self.fit_rates(iters)?;
            self.fit_switch_time(iters)?;
            self.fit_switch_and_rates(iters, false)?;

            // Repeat the joint stage under the configured assignment mode,
            // holding the (now projection-refined) times fixed.
            self.assignment_mode = self.options.assignment_mode;
            self.update(&ParamUpdate { adjust_switch: false, ..ParamUpdate::default() })?;
            self.fit_switch_and_rates(iters, true)?;
        }

        // Zero-budget fits must reproduce the initialization estimates
        // exactly, so the closing refresh may not stretch the switch.
        let closing =
            ParamUpdate { adjust_switch: self.options.max_iter > 0, ..ParamUpdate::default() };
        self.update(&closing)?;

        let shape = self.shape_for(&self.params.clone());
        let u_scaled = self.profile.u.mapv(|v| v / self.params.scaling);
        let (tau, tau_) =
            branch_times(&u_scaled, &self.profile.s, &shape, self.assignment_mode);
        self.branch_tau = tau;
        self.branch_tau_ = tau_;

        self.likelihood = self.log_likelihood_over(None).map(f64::exp).map_err(OptError::from)?;
        self.varx = self.residual_variance().map_err(OptError::from)?;
        Ok(())
    }

    // ---- Fitting stages ----------------------------------------------------

    fn fit_switch_and_alpha(&mut self, iters: u64) -> OptResult<()> {
        self.seed_stage(&[Seed::Alpha])?;
        let theta0 = vec![self.params.t_, self.params.alpha];
        self.run_stage(&theta0, iters, DEFAULT_SD_TOL, |theta| ParamUpdate {
            t_: Some(theta[0]),
            alpha: Some(theta[1]),
            ..ParamUpdate::default()
        })
    }

    fn fit_scaling_stage(&mut self, iters: u64) -> OptResult<()> {
        if self.options.fit_scaling {
            self.seed_stage(&[Seed::Beta, Seed::Scaling])?;
            let theta0 = vec![self.params.t_, self.params.beta, self.params.scaling];
            self.run_stage(&theta0, iters, DEFAULT_SD_TOL, |theta| ParamUpdate {
                t_: Some(theta[0]),
                beta: Some(theta[1]),
                scaling: Some(theta[2]),
                ..ParamUpdate::default()
            })
        } else {
            self.seed_stage(&[Seed::Beta])?;
            let theta0 = vec![self.params.t_, self.params.beta];
            self.run_stage(&theta0, iters, DEFAULT_SD_TOL, |theta| ParamUpdate {
                t_: Some(theta[0]),
                beta: Some(theta[1]),
                ..ParamUpdate::default()
            })
        }
    }

    fn fit_rates(&mut self, iters: u64) -> OptResult<()> {
        self.seed_stage(&[Seed::Alpha, Seed::Gamma])?;
        let theta0 = vec![self.params.alpha, self.params.gamma];
        self.run_stage(&theta0, iters, RATES_SD_TOL, |theta| ParamUpdate {
            alpha: Some(theta[0]),
            gamma: Some(theta[1]),
            ..ParamUpdate::default()
        })
    }

    fn fit_switch_time(&mut self, iters: u64) -> OptResult<()> {
        self.seed_stage(&[Seed::SwitchTime])?;
        let theta0 = vec![self.params.t_];
        self.run_stage(&theta0, iters, DEFAULT_SD_TOL, |theta| ParamUpdate {
            t_: Some(theta[0]),
            ..ParamUpdate::default()
        })
    }

    fn fit_switch_and_rates(&mut self, iters: u64, keep_time: bool) -> OptResult<()> {
        self.seed_stage(&[Seed::Alpha, Seed::Beta, Seed::Gamma])?;
        let theta0 =
            vec![self.params.t_, self.params.alpha, self.params.beta, self.params.gamma];
        self.run_stage(&theta0, iters, RATES_SD_TOL, move |theta| ParamUpdate {
            t_: Some(theta[0]),
            alpha: Some(theta[1]),
            beta: Some(theta[2]),
            gamma: Some(theta[3]),
            keep_time,
            ..ParamUpdate::default()
        })
    }

    /// Probe a coarse grid around the current value of each seeded
    /// parameter, keeping improvements, before the simplex starts.
    fn seed_stage(&mut self, seeds: &[Seed]) -> OptResult<()> {
        for seed in seeds {
            let (value, sight, count) = match seed {
                Seed::Alpha => (self.params.alpha, 0.1, 5),
                Seed::Beta => (self.params.beta, 0.1, 4),
                Seed::Gamma => (self.params.gamma, 0.1, 4),
                Seed::Scaling => (self.params.scaling, 0.1, 4),
                Seed::SwitchTime => (self.params.t_, 0.1, 4),
            };
            for k in 0..count {
                let offset = -1.0 + 2.0 * k as f64 / (count - 1) as f64;
                let probe = value + offset * value * sight;
                let upd = match seed {
                    Seed::Alpha => ParamUpdate { alpha: Some(probe), ..ParamUpdate::default() },
                    Seed::Beta => ParamUpdate { beta: Some(probe), ..ParamUpdate::default() },
                    Seed::Gamma => ParamUpdate { gamma: Some(probe), ..ParamUpdate::default() },
                    Seed::Scaling => {
                        ParamUpdate { scaling: Some(probe), ..ParamUpdate::default() }
                    }
                    Seed::SwitchTime => {
                        ParamUpdate { t_: Some(probe), ..ParamUpdate::default() }
                    }
                };
                self.update(&upd).map_err(OptError::from)?;
            }
        }
        Ok(())
    }

    fn run_stage<F>(
        &mut self, theta0: &[f64], iters: u64, sd_tol: f64, build: F,
    ) -> OptResult<()>
    where
        F: Fn(&[f64]) -> ParamUpdate,
    {
        let opts = SimplexOptions::new(iters, sd_tol)?;
        let outcome = minimize(StageProblem { model: self, build: &build }, theta0, &opts)?;
        self.update(&build(&outcome.theta)).map_err(OptError::from)?;
        Ok(())
    }

    // ---- Diagnostics -------------------------------------------------------

    /// Standardized residuals of the current state over the weighted
    /// observations, optionally restricted by an extra mask.
    fn residuals(&self, extra_mask: Option<&Array1<bool>>) -> (Vec<f64>, Vec<f64>) {
        let std_u = if self.profile.std_u > 0.0 { self.profile.std_u } else { 1.0 };
        let std_s = if self.profile.std_s > 0.0 { self.profile.std_s } else { 1.0 };
        let params = &self.params;
        let mut udiff = Vec::new();
        let mut sdiff = Vec::new();
        for i in 0..self.profile.n_obs() {
            if !self.profile.weights[i] || extra_mask.map_or(false, |m| !m[i]) {
                continue;
            }
            let (ut, st) = if self.assignment.on[i] {
                mrna(
                    self.assignment.tau[i],
                    self.u0,
                    self.s0,
                    params.alpha,
                    params.beta,
                    params.gamma,
                )
            } else {
                mrna(
                    self.assignment.tau[i],
                    self.u0_,
                    self.s0_,
                    self.alpha_,
                    params.beta,
                    params.gamma,
                )
            };
            udiff.push((ut - self.profile.u[i] / params.scaling) * params.scaling / std_u);
            sdiff.push((st - self.profile.s[i]) / std_s);
        }
        (udiff, sdiff)
    }

    /// Per-observation mean Gaussian log-likelihood of the current state.
    pub(crate) fn log_likelihood_over(
        &self, extra_mask: Option<&Array1<bool>>,
    ) -> KineticResult<f64> {
        let (udiff, sdiff) = self.residuals(extra_mask);
        if udiff.is_empty() {
            return Err(KineticError::NonFiniteLoss { value: f64::NAN });
        }
        let n = udiff.len() as f64;
        let distx: Vec<f64> =
            udiff.iter().zip(sdiff.iter()).map(|(u, s)| u * u + s * s).collect();
        let signed: Vec<f64> = distx
            .iter()
            .zip(sdiff.iter())
            .map(|(&d, &s)| s.signum() * d.sqrt())
            .collect();
        let mut varx = variance(&signed);
        if varx == 0.0 {
            varx = 1.0;
        }
        let loglik = -distx.iter().sum::<f64>() / (2.0 * n * varx)
            - 0.5 * (2.0 * std::f64::consts::PI * varx).ln();
        if !loglik.is_finite() {
            return Err(KineticError::NonFiniteLoss { value: loglik });
        }
        Ok(loglik)
    }

    /// Residual variance of the current state.
    fn residual_variance(&self) -> KineticResult<f64> {
        let (udiff, sdiff) = self.residuals(None);
        if udiff.is_empty() {
            return Err(KineticError::NonFiniteLoss { value: f64::NAN });
        }
        let distx: Vec<f64> =
            udiff.iter().zip(sdiff.iter()).map(|(u, s)| u * u + s * s).collect();
        let signed: Vec<f64> = distx
            .iter()
            .zip(sdiff.iter())
            .map(|(&d, &s)| s.signum() * d.sqrt())
            .collect();
        let mean_dist = distx.iter().sum::<f64>() / distx.len() as f64;
        let mean_signed = signed.iter().sum::<f64>() / signed.len() as f64;
        Ok(mean_dist - mean_signed * mean_signed)
    }

    // ---- Accessors ---------------------------------------------------------

    pub fn recoverable(&self) -> bool {
        self.profile.recoverable
    }

    pub fn params(&self) -> &KineticParams {
        &self.params
    }

    pub fn trace(&self) -> &FitTrace {
        &self.trace
    }

    pub fn assignment(&self) -> &TimeAssignment {
        &self.assignment
    }

    /// Induction- and repression-branch times of all observations.
    pub fn branch_taus(&self) -> (&Array1<f64>, &Array1<f64>) {
        (&self.branch_tau, &self.branch_tau_)
    }

    pub fn likelihood(&self) -> f64 {
        self.likelihood
    }

    pub fn variance(&self) -> f64 {
        self.varx
    }

    pub fn std_u(&self) -> f64 {
        self.profile.std_u
    }

    pub fn std_s(&self) -> f64 {
        self.profile.std_s
    }

    /// Expression reached at the switching event.
    pub fn switch_expression(&self) -> (f64, f64) {
        (self.u0_, self.s0_)
    }

    pub fn steady_u(&self) -> f64 {
        self.steady_u
    }

    pub fn steady_s(&self) -> f64 {
        self.steady_s
    }

    pub fn pval_steady(&self) -> f64 {
        self.pval_steady
    }

    pub fn steady_state_ratio(&self) -> f64 {
        self.steady_state_ratio
    }

    pub fn options(&self) -> &RecoveryOptions {
        &self.options
    }

    pub(crate) fn profile(&self) -> &GeneProfile {
        &self.profile
    }
}

/// Parameters a stage probes with its coarse seed grid.
enum Seed {
    Alpha,
    Beta,
    Gamma,
    Scaling,
    SwitchTime,
}

/// One fitting stage viewed by the optimizer: maps vertices to candidate
/// subsets and routes them through the model's update transition.
struct StageProblem<'a, F> {
    model: &'a mut KineticModel,
    build: &'a F,
}

impl<'a, F: Fn(&[f64]) -> ParamUpdate> CandidateUpdate for StageProblem<'a, F> {
    fn propose(&mut self, theta: &[f64]) -> OptResult<f64> {
        let upd = (self.build)(theta);
        let outcome = self.model.update(&upd).map_err(OptError::from)?;
        Ok(outcome.candidate_loss)
    }
}

fn mean_where(values: &[f64], mask: &[bool]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (v, &m) in values.iter().zip(mask.iter()) {
        if m {
            sum += v;
            count += 1;
        }
    }
    if count > 0 { sum / count as f64 } else { 0.0 }
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetics::core::trajectory::mrna;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the update transition (accept/reject, trace growth,
    // escape bound), initialization behavior on clean and degenerate genes,
    // and the zero-budget fit contract. End-to-end recovery across engines
    // lives in the integration tests.
    // -------------------------------------------------------------------------

    /// Synthetic gene sampled from a known trajectory with a deterministic
    /// low-amplitude perturbation.
    fn synthetic_gene(n_on: usize, n_off: usize) -> (Array1<f64>, Array1<f64>) {
        let (alpha, beta, gamma, t_) = (2.0, 1.0, 0.45, 5.0);
        let (u0_, s0_) = mrna(t_, 0.0, 0.0, alpha, beta, gamma);
        let mut u = Vec::new();
        let mut s = Vec::new();
        for k in 0..n_on {
            let tau = t_ * (k + 1) as f64 / (n_on + 1) as f64;
            let (ui, si) = mrna(tau, 0.0, 0.0, alpha, beta, gamma);
            let wiggle = 1.0 + 0.03 * ((k * 7 % 11) as f64 / 11.0 - 0.5);
            u.push((ui * wiggle).max(0.0));
            s.push((si / wiggle).max(0.0));
        }
        for k in 0..n_off {
            let tau = 4.0 * (k + 1) as f64 / n_off as f64;
            let (ui, si) = mrna(tau, u0_, s0_, 0.0, beta, gamma);
            let wiggle = 1.0 + 0.03 * ((k * 5 % 13) as f64 / 13.0 - 0.5);
            u.push((ui * wiggle).max(0.0));
            s.push((si / wiggle).max(0.0));
        }
        (Array1::from(u), Array1::from(s))
    }

    fn initialized_model() -> KineticModel {
        let (u, s) = synthetic_gene(40, 40);
        let mut model = KineticModel::new(u, s, RecoveryOptions::default()).unwrap();
        model.initialize().unwrap();
        model
    }

    #[test]
    // Purpose
    // -------
    // Verify initialization seeds a plausible state: recoverable, positive
    // rates, a valid switch, and a non-empty trace.
    fn initialize_produces_a_valid_starting_state() {
        let model = initialized_model();

        assert!(model.recoverable());
        assert!(!model.trace().is_empty());
        let p = model.params();
        assert!(p.alpha > 0.0, "alpha = {}", p.alpha);
        assert!(p.gamma > 0.0, "gamma = {}", p.gamma);
        assert!(p.t_ > 0.0, "t_ = {}", p.t_);
        assert!(p.scaling > 0.0, "scaling = {}", p.scaling);
    }

    #[test]
    // Purpose
    // -------
    // Verify a worsening candidate is rejected without touching state or
    // trace, and an improving candidate is accepted and appended.
    fn update_accepts_only_improving_candidates() {
        let mut model = initialized_model();
        let before_params = *model.params();
        let before_len = model.trace().len();

        // A grossly wrong production rate should not improve the loss.
        let worse = ParamUpdate {
            alpha: Some(before_params.alpha * 50.0),
            adjust_switch: false,
            ..ParamUpdate::default()
        };
        let outcome = model.update(&worse).unwrap();
        assert!(!outcome.accepted);
        assert_eq!(*model.params(), before_params);
        assert_eq!(model.trace().len(), before_len);
        assert!(outcome.candidate_loss.is_finite());
    }

    #[test]
    // Purpose
    // -------
    // Verify out-of-domain candidates are rejected with an infinite
    // candidate loss instead of erroring or mutating state.
    fn update_rejects_negative_rates_with_infinite_cost() {
        let mut model = initialized_model();
        let before_params = *model.params();

        let invalid = ParamUpdate { gamma: Some(-1.0), ..ParamUpdate::default() };
        let outcome = model.update(&invalid).unwrap();

        assert!(!outcome.accepted);
        assert_eq!(outcome.candidate_loss, f64::INFINITY);
        assert_eq!(*model.params(), before_params);
    }

    #[test]
    // Purpose
    // -------
    // Verify the accepted-loss trace never increases beyond the
    // switching-time extension band across a full fit.
    fn accepted_losses_respect_the_extension_band() {
        let mut model = initialized_model();
        model.fit().unwrap();

        let losses = model.trace().losses();
        assert!(losses.len() > 1, "fit should accept at least one update");
        for pair in losses.windows(2) {
            assert!(
                pair[1] * SWITCH_EXTENSION_TOL <= pair[0] + 1e-12,
                "loss rose beyond the band: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify a zero iteration budget leaves the initialized parameters
    // untouched by fit.
    fn zero_budget_fit_keeps_initialization_estimates() {
        let (u, s) = synthetic_gene(40, 40);
        let options = RecoveryOptions { max_iter: 0, ..RecoveryOptions::default() };
        let mut model = KineticModel::new(u, s, options).unwrap();
        model.initialize().unwrap();
        let before = *model.params();

        model.fit().unwrap();

        assert_eq!(*model.params(), before);
        assert!(model.likelihood().is_finite());
    }

    #[test]
    // Purpose
    // -------
    // Verify a constant-zero gene stays inert through initialize and fit.
    fn degenerate_gene_is_inert() {
        let zeros = Array1::<f64>::zeros(30);
        let mut model =
            KineticModel::new(zeros.clone(), zeros, RecoveryOptions::default()).unwrap();

        model.initialize().unwrap();
        model.fit().unwrap();

        assert!(!model.recoverable());
        assert!(model.trace().is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Verify fit before initialize is reported as an error on a
    // recoverable gene.
    fn fit_requires_initialization() {
        let (u, s) = synthetic_gene(40, 40);
        let mut model = KineticModel::new(u, s, RecoveryOptions::default()).unwrap();
        assert!(model.fit().is_err());
    }

    #[test]
    // Purpose
    // -------
    // Verify a full fit does not worsen the initialization loss and leaves
    // finite diagnostics.
    fn fit_improves_or_preserves_the_initial_loss() {
        let mut model = initialized_model();
        let first_loss = model.trace().losses()[0];

        model.fit().unwrap();

        let last_loss = model.trace().last_loss().unwrap();
        assert!(
            last_loss <= first_loss * 1.05,
            "final loss {last_loss} above initial {first_loss}"
        );
        assert!(model.likelihood().is_finite());
        assert!(model.variance().is_finite());
    }
}
