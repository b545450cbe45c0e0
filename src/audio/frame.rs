// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self { // just giving `default` a better name for clarity
        Self::default()
    }

    // Place a mono sample with an equal-power pan law; -1 is hard left.
    pub fn panned(sample: f32, pan: f32) -> Self {
        let theta = (pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
        Self {
            left: sample * theta.cos(),
            right: sample * theta.sin(),
        }
    }

    pub fn peak(&self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::AddAssign for StereoFrame {
    fn add_assign(&mut self, rhs: Self) {
        self.left += rhs.left;
        self.right += rhs.right;
    }
}

impl std::ops::Mul<f32> for StereoFrame {
    type Output = Self;

    fn mul(self, gain: f32) -> Self {
        Self {
            left: self.left * gain,
            right: self.right * gain,
        }
    }
}
