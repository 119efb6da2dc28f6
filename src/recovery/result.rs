//! Single-writer aggregation of per-gene fit snapshots.
//!
//! Purpose
//! -------
//! Fold arbitrary-order `(gene, snapshot)` outputs into gene-indexed output
//! columns and observation-by-gene matrices. The aggregator is the sole
//! mutator of shared output state and every snapshot is keyed by its own
//! gene index, which makes `collect` commutative: sequential and pooled
//! execution produce identical aggregated tables.
//!
//! The loss-trace matrix is ragged by nature; rows are right-padded with a
//! NaN sentinel to the longest trace seen so far and re-extended without
//! truncating prior history when a run refits on top of earlier results.

use ndarray::{Array1, Array2};

use crate::{
    engine::Collect,
    kinetics::core::params::KineticParams,
};

/// Sentinel filling unfitted cells and the ragged tail of loss traces.
const MISSING: f64 = f64::NAN;

/// One gene's fit snapshot as it crosses the channel boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneFit {
    pub gene: usize,
    pub recoverable: bool,
    pub params: KineticParams,
    pub std_u: f64,
    pub std_s: f64,
    pub likelihood: f64,
    pub variance: f64,
    /// Expression reached at the switching event.
    pub u0_: f64,
    pub s0_: f64,
    pub pval_steady: f64,
    pub steady_u: f64,
    pub steady_s: f64,
    /// Absolute fitted time per observation.
    pub t: Array1<f64>,
    /// Induction-branch time per observation.
    pub tau: Array1<f64>,
    /// Repression-branch time per observation.
    pub tau_: Array1<f64>,
    /// Accepted-loss trace of the fit.
    pub losses: Vec<f64>,
}

impl GeneFit {
    /// Snapshot of a gene that could not be fit.
    pub fn unrecoverable(gene: usize, n_obs: usize) -> Self {
        GeneFit {
            gene,
            recoverable: false,
            params: KineticParams {
                alpha: MISSING,
                beta: MISSING,
                gamma: MISSING,
                t_: MISSING,
                scaling: MISSING,
            },
            std_u: MISSING,
            std_s: MISSING,
            likelihood: MISSING,
            variance: MISSING,
            u0_: MISSING,
            s0_: MISSING,
            pval_steady: MISSING,
            steady_u: MISSING,
            steady_s: MISSING,
            t: Array1::from_elem(n_obs, MISSING),
            tau: Array1::from_elem(n_obs, MISSING),
            tau_: Array1::from_elem(n_obs, MISSING),
            losses: Vec::new(),
        }
    }
}

/// Gene-indexed loss-trace matrix with NaN right-padding.
#[derive(Debug, Clone, PartialEq)]
pub struct LossTraceMatrix {
    data: Array2<f64>,
}

impl LossTraceMatrix {
    /// Empty matrix over `n_genes` rows and no columns yet.
    pub fn new(n_genes: usize) -> Self {
        LossTraceMatrix { data: Array2::from_elem((n_genes, 0), MISSING) }
    }

    /// Insert one gene's trace, growing the column count to the longest
    /// trace seen so far. Existing rows are carried over unchanged, so a
    /// refit extends history without truncating it.
    pub fn insert(&mut self, gene: usize, losses: &[f64]) {
        if losses.len() > self.data.ncols() {
            let mut grown = Array2::from_elem((self.data.nrows(), losses.len()), MISSING);
            for row in 0..self.data.nrows() {
                for col in 0..self.data.ncols() {
                    grown[[row, col]] = self.data[[row, col]];
                }
            }
            self.data = grown;
        }
        for col in 0..self.data.ncols() {
            self.data[[gene, col]] = losses.get(col).copied().unwrap_or(MISSING);
        }
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// One gene's padded trace row.
    pub fn row(&self, gene: usize) -> Array1<f64> {
        self.data.row(gene).to_owned()
    }
}

/// Gene-indexed recovery output: the parameter table, diagnostics, fitted
/// time matrices, and the loss-trace matrix.
///
/// Implements [`Collect`]; this is the single writer every engine variant
/// folds results into.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryResult {
    pub alpha: Array1<f64>,
    /// Splicing rate, stored de-scaled (divided by the scaling factor).
    pub beta: Array1<f64>,
    pub gamma: Array1<f64>,
    pub t_: Array1<f64>,
    pub scaling: Array1<f64>,
    pub std_u: Array1<f64>,
    pub std_s: Array1<f64>,
    pub likelihood: Array1<f64>,
    pub u0_: Array1<f64>,
    pub s0_: Array1<f64>,
    pub pval_steady: Array1<f64>,
    /// Steady unspliced level, stored re-scaled (multiplied by scaling).
    pub steady_u: Array1<f64>,
    pub steady_s: Array1<f64>,
    pub variance: Array1<f64>,
    pub recoverable: Array1<bool>,
    /// Fitted absolute time, observations by genes.
    pub t: Array2<f64>,
    /// Induction-branch time, observations by genes.
    pub tau: Array2<f64>,
    /// Repression-branch time, observations by genes.
    pub tau_: Array2<f64>,
    /// Ragged accepted-loss traces, NaN right-padded.
    pub loss: LossTraceMatrix,
    fitted: Vec<usize>,
}

impl RecoveryResult {
    /// Fresh all-missing output over the dataset dimensions.
    pub fn new(n_obs: usize, n_genes: usize) -> Self {
        RecoveryResult {
            alpha: Array1::from_elem(n_genes, MISSING),
            beta: Array1::from_elem(n_genes, MISSING),
            gamma: Array1::from_elem(n_genes, MISSING),
            t_: Array1::from_elem(n_genes, MISSING),
            scaling: Array1::from_elem(n_genes, MISSING),
            std_u: Array1::from_elem(n_genes, MISSING),
            std_s: Array1::from_elem(n_genes, MISSING),
            likelihood: Array1::from_elem(n_genes, MISSING),
            u0_: Array1::from_elem(n_genes, MISSING),
            s0_: Array1::from_elem(n_genes, MISSING),
            pval_steady: Array1::from_elem(n_genes, MISSING),
            steady_u: Array1::from_elem(n_genes, MISSING),
            steady_s: Array1::from_elem(n_genes, MISSING),
            variance: Array1::from_elem(n_genes, MISSING),
            recoverable: Array1::from_elem(n_genes, false),
            t: Array2::from_elem((n_obs, n_genes), MISSING),
            tau: Array2::from_elem((n_obs, n_genes), MISSING),
            tau_: Array2::from_elem((n_obs, n_genes), MISSING),
            loss: LossTraceMatrix::new(n_genes),
            fitted: Vec::new(),
        }
    }

    /// Continue on top of an earlier output: prior values and loss history
    /// are carried over; refit genes overwrite their own columns only.
    pub fn continuing(prior: &RecoveryResult) -> Self {
        let mut carried = prior.clone();
        carried.fitted = Vec::new();
        carried
    }

    /// Genes fitted during this run, in arrival order.
    pub fn fitted(&self) -> &[usize] {
        &self.fitted
    }

    /// Smooth the fitted-time columns of this run's genes with a cell-cell
    /// connectivity matrix: each fitted column becomes `conn . column`.
    pub fn smooth_fitted_time(&mut self, conn: &Array2<f64>) {
        for &gene in &self.fitted {
            if !self.recoverable[gene] {
                continue;
            }
            let column = self.t.column(gene).to_owned();
            let smoothed = conn.dot(&column);
            self.t.column_mut(gene).assign(&smoothed);
        }
    }
}

impl Collect for RecoveryResult {
    type Output = GeneFit;

    /// Fold one gene snapshot into the gene-indexed columns.
    ///
    /// Unrecoverable genes are logged and leave their output row missing;
    /// all other genes write their own columns only, keyed by gene index,
    /// so call order cannot leak into the aggregate.
    fn collect(&mut self, fit: GeneFit) {
        let ix = fit.gene;
        self.fitted.push(ix);
        if !fit.recoverable {
            log::warn!("gene {ix} not recoverable due to insufficient samples");
            self.recoverable[ix] = false;
            return;
        }

        let p = fit.params;
        self.alpha[ix] = p.alpha;
        self.beta[ix] = p.beta / p.scaling;
        self.gamma[ix] = p.gamma;
        self.t_[ix] = p.t_;
        self.scaling[ix] = p.scaling;
        self.std_u[ix] = fit.std_u;
        self.std_s[ix] = fit.std_s;
        self.likelihood[ix] = fit.likelihood;
        self.u0_[ix] = fit.u0_;
        self.s0_[ix] = fit.s0_;
        self.pval_steady[ix] = fit.pval_steady;
        self.steady_u[ix] = fit.steady_u * p.scaling;
        self.steady_s[ix] = fit.steady_s;
        self.variance[ix] = fit.variance;
        self.recoverable[ix] = true;

        self.t.column_mut(ix).assign(&fit.t);
        self.tau.column_mut(ix).assign(&fit.tau);
        self.tau_.column_mut(ix).assign(&fit.tau_);
        self.loss.insert(ix, &fit.losses);
    }
}
