//! Exact temporal inference over hidden Markov models.
//!
//! - [`ForwardBackward`]: filtering (`forward`), the backward message and
//!   offline smoothing over a whole evidence sequence.
//! - [`FixedLagSmoothing`]: online smoothing of the state `d` steps in the
//!   past, updated in constant time per observation.
//!
//! Messages are column vectors over the state domain:
//!
//! ```text
//! f_{1:t+1} = normalize(O_{t+1} · Tᵀ · f_{1:t})
//! b_{k+1:t} = T · O_{k+1} · b_{k+2:t}
//! ```

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::domain::AssignmentProposition;
use crate::error::ProbError;
use crate::hmm::HiddenMarkovModel;
use crate::matrix::Matrix;
use crate::table::CategoricalDistribution;

fn normalize_column(m: &Matrix) -> Matrix {
    let sum: f64 = m.as_slice().iter().sum();
    if sum == 0.0 {
        return m.clone();
    }
    let values: Vec<f64> = m.as_slice().iter().map(|v| v / sum).collect();
    Matrix::column(&values)
}

/// One filtering step on column messages.
fn forward_step(hmm: &HiddenMarkovModel, f: &Matrix, o: &Matrix) -> Result<Matrix, ProbError> {
    let predicted = hmm.transition_matrix().transpose().multiply(f)?;
    Ok(normalize_column(&o.multiply(&predicted)?))
}

/// Offline and one-step temporal inference.
///
/// # Example
///
/// ```rust
/// use compositional_inference::{networks, ForwardBackward};
///
/// let hmm = networks::umbrella_hmm().unwrap();
/// let umbrella = hmm.evidence_variable().clone();
/// let fb = ForwardBackward::new(hmm);
///
/// let f1 = fb.forward(fb.hmm().prior(), &[umbrella.assign(true).unwrap()]).unwrap();
/// assert!((f1.values()[0] - 0.818).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct ForwardBackward {
    hmm: HiddenMarkovModel,
}

impl ForwardBackward {
    pub fn new(hmm: HiddenMarkovModel) -> Self {
        Self { hmm }
    }

    pub fn hmm(&self) -> &HiddenMarkovModel {
        &self.hmm
    }

    /// `normalize(O_e · Tᵀ · f)`: the filtered state after one more
    /// observation.
    pub fn forward(
        &self,
        f: &CategoricalDistribution,
        e: &[AssignmentProposition],
    ) -> Result<CategoricalDistribution, ProbError> {
        let o = self.hmm.sensor_model(e)?;
        let next = forward_step(&self.hmm, &self.hmm.message(f)?, &o)?;
        self.hmm.convert(&next)
    }

    /// `T · O_e · b`: the backward message one step earlier. Not normalized.
    pub fn backward(
        &self,
        b: &CategoricalDistribution,
        e: &[AssignmentProposition],
    ) -> Result<CategoricalDistribution, ProbError> {
        let o = self.hmm.sensor_model(e)?;
        let prev = self
            .hmm
            .transition_matrix()
            .multiply(&o)?
            .multiply(&self.hmm.message(b)?)?;
        self.hmm.convert(&prev)
    }

    /// Smoothed estimates `P(X_k | e_{1:t})` for `k = 1..=t`, in
    /// chronological order.
    pub fn forward_backward(
        &self,
        evidence: &[Vec<AssignmentProposition>],
        prior: &CategoricalDistribution,
    ) -> Result<Vec<CategoricalDistribution>, ProbError> {
        let t = evidence.len();
        debug!(steps = t, "forward-backward");

        let sensors = evidence
            .iter()
            .map(|e| self.hmm.sensor_model(e))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fv = Vec::with_capacity(t + 1);
        fv.push(self.hmm.message(prior)?);
        for o in &sensors {
            let next = forward_step(&self.hmm, &fv[fv.len() - 1], o)?;
            fv.push(next);
        }

        let t_matrix = self.hmm.transition_matrix();
        let mut b = self.hmm.unit_message();
        let mut sv = vec![None; t];
        for i in (1..=t).rev() {
            let smoothed = normalize_column(&fv[i].hadamard(&b)?);
            trace!(step = i, smoothed = ?smoothed.as_slice(), "smoothed");
            sv[i - 1] = Some(self.hmm.convert(&smoothed)?);
            b = t_matrix.multiply(&sensors[i - 1])?.multiply(&b)?;
        }
        Ok(sv.into_iter().flatten().collect())
    }
}

/// Online smoothing with a fixed lag `d`.
///
/// After observing `e_t` with `t > d` it returns `P(X_{t-d} | e_{1:t})`;
/// before that there is nothing to report yet. The forward message for
/// `t - d` and the backward transformation `B = Π T·O` over the window are
/// updated incrementally, which needs `T` and every `O` in the window to be
/// invertible.
#[derive(Debug, Clone)]
pub struct FixedLagSmoothing {
    hmm: HiddenMarkovModel,
    d: usize,
    t: usize,
    f: Matrix,
    b: Matrix,
    window: VecDeque<Matrix>,
}

impl FixedLagSmoothing {
    pub fn new(hmm: HiddenMarkovModel, d: usize) -> Result<Self, ProbError> {
        let f = hmm.message(hmm.prior())?;
        let b = Matrix::identity(hmm.state_variable().domain().size());
        Ok(Self {
            hmm,
            d,
            t: 1,
            f,
            b,
            window: VecDeque::with_capacity(d + 1),
        })
    }

    pub fn lag(&self) -> usize {
        self.d
    }

    /// The index of the next time step to be observed.
    pub fn time(&self) -> usize {
        self.t
    }

    /// Feed the evidence for the current time step.
    ///
    /// # Errors
    ///
    /// Fails on malformed evidence or when `T` or the sensor matrix leaving
    /// the window is singular. On error the smoother state is unchanged.
    pub fn fixed_lag_smoothing(
        &mut self,
        e: &[AssignmentProposition],
    ) -> Result<Option<CategoricalDistribution>, ProbError> {
        let o_t = self.hmm.sensor_model(e)?;
        let t_matrix = self.hmm.transition_matrix();
        let t_o = t_matrix.multiply(&o_t)?;

        let ready = self.t > self.d;
        let (f, b) = if ready {
            let oldest = self.window.front().unwrap_or(&o_t);
            let f = forward_step(&self.hmm, &self.f, oldest)?;
            let b = oldest
                .inverse()?
                .multiply(&t_matrix.inverse()?)?
                .multiply(&self.b)?
                .multiply(&t_o)?;
            (f, b)
        } else {
            (self.f.clone(), self.b.multiply(&t_o)?)
        };

        self.window.push_back(o_t);
        if ready {
            self.window.pop_front();
        }
        self.f = f;
        self.b = b;
        debug!(t = self.t, lag = self.d, ready, "fixed-lag step");
        self.t += 1;

        if !ready {
            return Ok(None);
        }
        let backward = self.b.multiply(&self.hmm.unit_message())?;
        let smoothed = normalize_column(&self.f.hadamard(&backward)?);
        Ok(Some(self.hmm.convert(&smoothed)?))
    }
}
