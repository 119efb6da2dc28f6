//! Read-only input container for recovery runs.
//!
//! Purpose
//! -------
//! Hold the smoothed abundance matrices (N observations by G genes), the
//! gene names, and the optional cell-cell connectivity matrix used for
//! post-hoc smoothing of fitted time. The dataset is validated once on
//! construction and then shared immutably into every worker, so the large
//! inputs are never copied per worker; each gene's working state is cloned
//! out of it by the claiming worker only.

use ndarray::{Array1, Array2};

use crate::recovery::errors::{RecoveryError, RecoveryResultOf};

/// Validated, read-only recovery input.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceDataset {
    unspliced: Array2<f64>,
    spliced: Array2<f64>,
    gene_names: Vec<String>,
    connectivities: Option<Array2<f64>>,
}

impl AbundanceDataset {
    /// Construct a validated dataset.
    ///
    /// # Errors
    /// - [`RecoveryError::MatrixShapeMismatch`] when the matrices disagree.
    /// - [`RecoveryError::GeneNameCountMismatch`] when names and columns
    ///   disagree.
    /// - [`RecoveryError::InvalidAbundance`] for non-finite or negative
    ///   entries.
    /// - [`RecoveryError::ConnectivityShapeMismatch`] when the connectivity
    ///   matrix is not N by N.
    pub fn new(
        unspliced: Array2<f64>, spliced: Array2<f64>, gene_names: Vec<String>,
        connectivities: Option<Array2<f64>>,
    ) -> RecoveryResultOf<Self> {
        if unspliced.dim() != spliced.dim() {
            return Err(RecoveryError::MatrixShapeMismatch {
                unspliced: unspliced.dim(),
                spliced: spliced.dim(),
            });
        }
        let (n_obs, n_genes) = unspliced.dim();
        if gene_names.len() != n_genes {
            return Err(RecoveryError::GeneNameCountMismatch {
                expected: n_genes,
                actual: gene_names.len(),
            });
        }
        for matrix in [&unspliced, &spliced] {
            for ((row, col), &value) in matrix.indexed_iter() {
                if !value.is_finite() || value < 0.0 {
                    return Err(RecoveryError::InvalidAbundance { row, col, value });
                }
            }
        }
        if let Some(conn) = &connectivities {
            if conn.dim() != (n_obs, n_obs) {
                return Err(RecoveryError::ConnectivityShapeMismatch {
                    expected: (n_obs, n_obs),
                    actual: conn.dim(),
                });
            }
        }
        Ok(AbundanceDataset { unspliced, spliced, gene_names, connectivities })
    }

    pub fn n_obs(&self) -> usize {
        self.unspliced.nrows()
    }

    pub fn n_genes(&self) -> usize {
        self.unspliced.ncols()
    }

    pub fn gene_names(&self) -> &[String] {
        &self.gene_names
    }

    pub fn connectivities(&self) -> Option<&Array2<f64>> {
        self.connectivities.as_ref()
    }

    /// Owned copies of one gene's signal pair.
    pub fn gene(&self, index: usize) -> (Array1<f64>, Array1<f64>) {
        (self.unspliced.column(index).to_owned(), self.spliced.column(index).to_owned())
    }
}

/// Which genes a recovery run fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneSelection {
    /// Every gene in the dataset.
    All,
    /// Genes by name; unknown names are fatal before dispatch.
    Names(Vec<String>),
    /// Genes by column index; out-of-range indices are fatal before
    /// dispatch.
    Indices(Vec<usize>),
}

impl GeneSelection {
    /// Resolve the selection into concrete column indices.
    ///
    /// Resolution happens before any task is scheduled; an unresolved name
    /// or an empty result aborts the whole run with no partial work.
    pub fn resolve(&self, dataset: &AbundanceDataset) -> RecoveryResultOf<Vec<usize>> {
        let indices = match self {
            GeneSelection::All => (0..dataset.n_genes()).collect::<Vec<_>>(),
            GeneSelection::Names(names) => {
                let mut indices = Vec::with_capacity(names.len());
                for name in names {
                    let ix = dataset
                        .gene_names()
                        .iter()
                        .position(|candidate| candidate == name)
                        .ok_or_else(|| RecoveryError::UnknownGene { name: name.clone() })?;
                    indices.push(ix);
                }
                indices
            }
            GeneSelection::Indices(indices) => {
                for &index in indices {
                    if index >= dataset.n_genes() {
                        return Err(RecoveryError::GeneIndexOutOfRange {
                            index,
                            n_genes: dataset.n_genes(),
                        });
                    }
                }
                indices.clone()
            }
        };
        if indices.is_empty() {
            return Err(RecoveryError::EmptyGeneSet);
        }
        Ok(indices)
    }
}
