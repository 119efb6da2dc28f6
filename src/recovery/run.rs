//! Recovery orchestration: gene resolution, per-gene work, aggregation.
//!
//! Purpose
//! -------
//! Drive the full recovery of a gene set: resolve the gene selection (fatal
//! before any task is dispatched), build the per-gene work function over
//! the shared read-only dataset, run it through the chosen engine, and
//! apply the optional connectivity smoothing of fitted time.
//!
//! Failure isolation
//! -----------------
//! A single gene's fit failing on degenerate input is caught at the work
//! boundary and converted into a snapshot carrying the not-recoverable
//! flag plus a warning; it never propagates up and never aborts the pool.
//! Only pre-dispatch configuration failures abort the whole run.

use crate::{
    engine::Engine,
    kinetics::{
        core::{options::RecoveryOptions, params::KineticParams},
        errors::KineticError,
        models::recovery::KineticModel,
    },
    recovery::{
        dataset::{AbundanceDataset, GeneSelection},
        errors::RecoveryResultOf,
        result::{GeneFit, RecoveryResult},
    },
};

/// Recover kinetics for the selected genes.
///
/// Parameters
/// ----------
/// - `dataset`: validated read-only abundance input, shared by reference
///   into every worker.
/// - `selection`: which genes to fit; resolution errors are fatal before
///   any task is scheduled.
/// - `engine`: execution strategy, chosen once here and never per task.
/// - `options`: per-gene fitting configuration.
/// - `prior`: earlier output to continue on top of. Unfit genes keep their
///   prior values, the loss history re-extends, and when
///   `options.reuse_params` is set, genes with finite prior parameters are
///   seeded from the table instead of re-initialized.
///
/// Returns
/// -------
/// The aggregated [`RecoveryResult`]. Given identical inputs, sequential
/// and pooled engines produce identical aggregates.
pub fn recover_dynamics(
    dataset: &AbundanceDataset, selection: &GeneSelection, engine: &Engine,
    options: &RecoveryOptions, prior: Option<&RecoveryResult>,
) -> RecoveryResultOf<RecoveryResult> {
    let genes = selection.resolve(dataset)?;
    log::info!("recovering dynamics for {} genes", genes.len());

    let mut result = match prior {
        Some(prior) => RecoveryResult::continuing(prior),
        None => RecoveryResult::new(dataset.n_obs(), dataset.n_genes()),
    };

    let work = |&gene: &usize| fit_single(dataset, gene, options, prior);
    engine.run(&genes, &work, &mut result)?;

    if options.fit_connected_states {
        if let Some(conn) = dataset.connectivities() {
            result.smooth_fitted_time(conn);
        }
    }
    Ok(result)
}

/// Fit one gene, containing every task-local failure at this boundary.
pub(crate) fn fit_single(
    dataset: &AbundanceDataset, gene: usize, options: &RecoveryOptions,
    prior: Option<&RecoveryResult>,
) -> GeneFit {
    match try_fit(dataset, gene, options, prior) {
        Ok(fit) => fit,
        Err(err) => {
            log::warn!("gene {gene}: {err}; marked not recoverable");
            GeneFit::unrecoverable(gene, dataset.n_obs())
        }
    }
}

fn try_fit(
    dataset: &AbundanceDataset, gene: usize, options: &RecoveryOptions,
    prior: Option<&RecoveryResult>,
) -> Result<GeneFit, KineticError> {
    let (u, s) = dataset.gene(gene);
    let mut model = KineticModel::new(u, s, options.clone())?;

    let seeded = match prior {
        Some(prior) if options.reuse_params && prior.alpha[gene].is_finite() => {
            // Undo the storage normalization of the splicing rate.
            let params = KineticParams {
                alpha: prior.alpha[gene],
                beta: prior.beta[gene] * prior.scaling[gene],
                gamma: prior.gamma[gene],
                t_: prior.t_[gene],
                scaling: prior.scaling[gene],
            };
            model.seed_from(params)?;
            true
        }
        _ => false,
    };
    if !seeded {
        model.initialize()?;
    }

    if model.recoverable() {
        model.fit().map_err(|err| KineticError::FitFailed { text: err.to_string() })?;
    }

    Ok(snapshot(gene, dataset.n_obs(), &model))
}

/// Freeze a fitted model into the channel-crossing snapshot.
fn snapshot(gene: usize, n_obs: usize, model: &KineticModel) -> GeneFit {
    if !model.recoverable() {
        return GeneFit::unrecoverable(gene, n_obs);
    }
    let (tau, tau_) = model.branch_taus();
    let (u0_, s0_) = model.switch_expression();
    GeneFit {
        gene,
        recoverable: true,
        params: *model.params(),
        std_u: model.std_u(),
        std_s: model.std_s(),
        likelihood: model.likelihood(),
        variance: model.variance(),
        u0_,
        s0_,
        pval_steady: model.pval_steady(),
        steady_u: model.steady_u(),
        steady_s: model.steady_s(),
        t: model.assignment().t.clone(),
        tau: tau.clone(),
        tau_: tau_.clone(),
        losses: model.trace().losses().to_vec(),
    }
}
