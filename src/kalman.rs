use nalgebra as na;

use crate::error::Error;
use crate::Float;

/// Discrete-time constant-velocity Kalman filter over state
/// `(x, y, vx, vy)` with position-only observations. Process noise is the
/// standard white-noise-acceleration covariance scaled by the acceleration
/// magnitude.
#[derive(Debug, Clone)]
pub struct MotionFilter<F: Float> {
    transition: na::Matrix4<F>,
    observation: na::Matrix2x4<F>,
    process_noise: na::Matrix4<F>,
    measurement_noise: na::Matrix2<F>,
    state: na::Vector4<F>,
    covariance: na::Matrix4<F>,
    latest: na::Point2<F>,
}

impl<F: Float> MotionFilter<F> {
    pub fn new(initial: na::Point2<F>, dt: F, accel_noise: F, measurement_noise: F) -> Self {
        let zero = F::zero();
        let one = F::one();
        let two = F::from_f32(2.0).unwrap();
        let four = F::from_f32(4.0).unwrap();

        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        #[rustfmt::skip]
        let transition = na::Matrix4::new(
            one, zero, dt, zero,
            zero, one, zero, dt,
            zero, zero, one, zero,
            zero, zero, zero, one,
        );

        #[rustfmt::skip]
        let observation = na::Matrix2x4::new(
            one, zero, zero, zero,
            zero, one, zero, zero,
        );

        #[rustfmt::skip]
        let process_noise = na::Matrix4::new(
            dt4 / four, zero, dt3 / two, zero,
            zero, dt4 / four, zero, dt3 / two,
            dt3 / two, zero, dt2, zero,
            zero, dt3 / two, zero, dt2,
        ) * (accel_noise * accel_noise);

        let r = measurement_noise * measurement_noise;
        let measurement_noise = na::Matrix2::new(r, zero, zero, r);

        // Wide initial uncertainty on every state component.
        let prior = F::from_f32(1e3).unwrap();

        Self {
            transition,
            observation,
            process_noise,
            measurement_noise,
            state: na::Vector4::new(initial.x, initial.y, zero, zero),
            covariance: na::Matrix4::identity() * prior,
            latest: initial,
        }
    }

    /// Advance the state one step and return the predicted position.
    pub fn predict(&mut self) -> na::Point2<F> {
        self.state = self.transition * self.state;
        self.covariance =
            self.transition * self.covariance * self.transition.transpose() + self.process_noise;
        self.latest = na::Point2::new(self.state[0], self.state[1]);

        self.latest
    }

    /// Last predicted or corrected position, without touching the state.
    #[inline]
    pub fn latest_prediction(&self) -> na::Point2<F> {
        self.latest
    }

    /// Measurement update with an observed position.
    pub fn correct(&mut self, observation: na::Point2<F>) -> Result<(), Error> {
        let innovation_cov = self.observation * self.covariance * self.observation.transpose()
            + self.measurement_noise;
        let inverse = innovation_cov.try_inverse().ok_or(Error::FilterDiverged)?;
        let gain = self.covariance * self.observation.transpose() * inverse;

        let residual =
            na::Vector2::new(observation.x, observation.y) - self.observation * self.state;
        self.state += gain * residual;
        self.covariance = (na::Matrix4::identity() - gain * self.observation) * self.covariance;
        self.latest = na::Point2::new(self.state[0], self.state[1]);

        Ok(())
    }

    /// Feed the last prediction back as a synthetic observation, keeping
    /// the position history dense through detection gaps.
    pub fn correct_no_obs(&mut self) -> Result<(), Error> {
        let synthetic = self.latest;
        self.correct(synthetic)
    }

    #[inline]
    pub fn position(&self) -> na::Point2<F> {
        na::Point2::new(self.state[0], self.state[1])
    }

    #[inline]
    pub fn velocity(&self) -> na::Vector2<F> {
        na::Vector2::new(self.state[2], self.state[3])
    }
}
