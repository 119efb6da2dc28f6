//! Likelihood-ratio test for group-specific kinetics.
//!
//! Purpose
//! -------
//! Decide, per observation group, whether an independent kinetic fit
//! explains the group's observations significantly better than the joint
//! single-gene model. Each group is refit in isolation; its mean per-cell
//! log-likelihood is compared against the joint model's log-likelihood over
//! the same cells via `LR = 2 n (ll_group - ll_joint)`, referred to a
//! chi-squared distribution with one degree of freedom.
//!
//! Groups with too few weighted observations are skipped and reported with
//! NaN statistics rather than failing the whole test.

use ndarray::Array1;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::{
    kinetics::{
        errors::KineticError,
        models::recovery::KineticModel,
    },
    optimization::errors::{OptError, OptResult},
};

/// Minimum weighted observations a group needs to be tested.
pub const MIN_GROUP_OBS: usize = 10;

/// Significance level at which a group is flagged kinetically divergent.
const DIVERGENCE_ALPHA: f64 = 0.05;

/// Per-group outcome of the differential kinetics test.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialKinetics {
    /// Group names, in membership-index order.
    pub group_names: Vec<String>,
    /// Likelihood-ratio statistic per group; NaN for skipped groups.
    pub lr_stats: Vec<f64>,
    /// Chi-squared(1) p-value per group; NaN for skipped groups.
    pub pvals: Vec<f64>,
    /// Whether each group is flagged kinetically divergent.
    pub divergent: Vec<bool>,
    /// Smallest finite group p-value; NaN when every group was skipped.
    pub pval_overall: f64,
    /// `+`-joined names of the flagged groups.
    pub label: String,
}

impl KineticModel {
    /// Test each observation group for kinetics that diverge from the joint
    /// fit of this model.
    ///
    /// Parameters
    /// ----------
    /// - `membership`: per-observation group index into `group_names`.
    /// - `group_names`: display names of the groups; its length fixes the
    ///   number of groups tested.
    ///
    /// Behavior
    /// --------
    /// For every group with at least [`MIN_GROUP_OBS`] weighted cells, an
    /// independent model is initialized and fit on the group's observations
    /// with this model's options (the steady-state prior is restricted to
    /// the group). The summed group evidence is compared to the joint model
    /// through per-group likelihood-ratio statistics.
    ///
    /// # Errors
    /// - `KineticError::GroupLengthMismatch` / `EmptyGroupSet` for malformed
    ///   inputs, converted into the optimizer error surface.
    /// - Propagates fit errors of the per-group models.
    pub fn differential_kinetic_test(
        &self, membership: &[usize], group_names: &[String],
    ) -> OptResult<DifferentialKinetics> {
        let n = self.profile().n_obs();
        if membership.len() != n {
            return Err(OptError::from(KineticError::GroupLengthMismatch {
                expected: n,
                actual: membership.len(),
            }));
        }
        if group_names.is_empty() {
            return Err(OptError::from(KineticError::EmptyGroupSet));
        }

        let chi2 = ChiSquared::new(1.0).expect("freedom = 1");
        let mut lr_stats = Vec::with_capacity(group_names.len());
        let mut pvals = Vec::with_capacity(group_names.len());
        let mut divergent = Vec::with_capacity(group_names.len());

        for g in 0..group_names.len() {
            let mask = Array1::from_iter(membership.iter().map(|&m| m == g));
            let n_g = (0..n).filter(|&i| mask[i] && self.profile().weights[i]).count();
            if n_g < MIN_GROUP_OBS {
                lr_stats.push(f64::NAN);
                pvals.push(f64::NAN);
                divergent.push(false);
                continue;
            }

            let ll_joint = match self.log_likelihood_over(Some(&mask)) {
                Ok(ll) => ll,
                Err(_) => {
                    lr_stats.push(f64::NAN);
                    pvals.push(f64::NAN);
                    divergent.push(false);
                    continue;
                }
            };

            let mut sub = self.group_model(&mask)?;
            sub.initialize().map_err(OptError::from)?;
            if !sub.recoverable() {
                lr_stats.push(f64::NAN);
                pvals.push(f64::NAN);
                divergent.push(false);
                continue;
            }
            sub.fit()?;
            let ll_group = match sub.log_likelihood_over(None) {
                Ok(ll) => ll,
                Err(_) => {
                    lr_stats.push(f64::NAN);
                    pvals.push(f64::NAN);
                    divergent.push(false);
                    continue;
                }
            };

            let lr = (2.0 * n_g as f64 * (ll_group - ll_joint)).max(0.0);
            let pval = 1.0 - chi2.cdf(lr);
            lr_stats.push(lr);
            pvals.push(pval);
            divergent.push(pval < DIVERGENCE_ALPHA);
        }

        let pval_overall = pvals
            .iter()
            .copied()
            .filter(|p| p.is_finite())
            .fold(f64::NAN, |acc, p| if acc.is_nan() || p < acc { p } else { acc });
        let label = group_names
            .iter()
            .zip(divergent.iter())
            .filter(|(_, &d)| d)
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join("+");

        Ok(DifferentialKinetics {
            group_names: group_names.to_vec(),
            lr_stats,
            pvals,
            divergent,
            pval_overall,
            label,
        })
    }

    /// Build an unfitted model over one group's observations, carrying this
    /// model's options with the steady-state prior restricted to the group.
    fn group_model(&self, mask: &Array1<bool>) -> OptResult<KineticModel> {
        let idx: Vec<usize> = (0..self.profile().n_obs()).filter(|&i| mask[i]).collect();
        let u = Array1::from_iter(idx.iter().map(|&i| self.profile().u[i]));
        let s = Array1::from_iter(idx.iter().map(|&i| self.profile().s[i]));
        let mut options = self.options().clone();
        options.steady_state_prior = options
            .steady_state_prior
            .as_ref()
            .map(|prior| Array1::from_iter(idx.iter().map(|&i| prior[i])));
        KineticModel::new(u, s, options).map_err(OptError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetics::core::{options::RecoveryOptions, trajectory::mrna};

    /// Two groups drawn from the same trajectory; the joint fit should
    /// explain both, so neither group ought to be flagged at 5%.
    fn homogeneous_gene() -> (Array1<f64>, Array1<f64>, Vec<usize>) {
        let (alpha, beta, gamma, t_) = (2.0, 1.0, 0.45, 5.0);
        let (u0_, s0_) = mrna(t_, 0.0, 0.0, alpha, beta, gamma);
        let mut u = Vec::new();
        let mut s = Vec::new();
        let mut membership = Vec::new();
        for k in 0..30 {
            let tau = t_ * (k + 1) as f64 / 31.0;
            let (ui, si) = mrna(tau, 0.0, 0.0, alpha, beta, gamma);
            u.push(ui);
            s.push(si);
            membership.push(k % 2);
        }
        for k in 0..30 {
            let tau = 4.0 * (k + 1) as f64 / 30.0;
            let (ui, si) = mrna(tau, u0_, s0_, 0.0, beta, gamma);
            u.push(ui);
            s.push(si);
            membership.push(k % 2);
        }
        (Array1::from(u), Array1::from(s), membership)
    }

    #[test]
    // Purpose
    // -------
    // Verify shape and range invariants of the outcome on a homogeneous
    // gene: one entry per group, p-values in [0, 1] or NaN, and no label
    // content for unflagged groups.
    fn outcome_is_well_formed_on_homogeneous_groups() {
        let (u, s, membership) = homogeneous_gene();
        let mut model = KineticModel::new(u, s, RecoveryOptions::default()).unwrap();
        model.initialize().unwrap();
        model.fit().unwrap();

        let names = vec!["a".to_string(), "b".to_string()];
        let outcome = model.differential_kinetic_test(&membership, &names).unwrap();

        assert_eq!(outcome.pvals.len(), 2);
        assert_eq!(outcome.lr_stats.len(), 2);
        assert_eq!(outcome.divergent.len(), 2);
        for &p in &outcome.pvals {
            assert!(p.is_nan() || (0.0..=1.0).contains(&p), "p-value out of range: {p}");
        }
        for (&d, name) in outcome.divergent.iter().zip(names.iter()) {
            if !d {
                assert!(!outcome.label.contains(name.as_str()) || outcome.label.is_empty());
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify undersized groups are skipped with NaN statistics instead of
    // failing the test.
    fn tiny_groups_are_skipped() {
        let (u, s, mut membership) = homogeneous_gene();
        // Rebind all but three observations to group 0.
        for (i, m) in membership.iter_mut().enumerate() {
            *m = if i < 3 { 1 } else { 0 };
        }
        let mut model = KineticModel::new(u, s, RecoveryOptions::default()).unwrap();
        model.initialize().unwrap();
        model.fit().unwrap();

        let names = vec!["big".to_string(), "tiny".to_string()];
        let outcome = model.differential_kinetic_test(&membership, &names).unwrap();

        assert!(outcome.pvals[1].is_nan());
        assert!(!outcome.divergent[1]);
    }

    #[test]
    // Purpose
    // -------
    // Verify malformed membership vectors are rejected up front.
    fn membership_length_is_validated() {
        let (u, s, _) = homogeneous_gene();
        let mut model = KineticModel::new(u, s, RecoveryOptions::default()).unwrap();
        model.initialize().unwrap();

        let names = vec!["a".to_string()];
        assert!(model.differential_kinetic_test(&[0, 1, 0], &names).is_err());
        assert!(model.differential_kinetic_test(&vec![0; 60], &[]).is_err());
    }
}
