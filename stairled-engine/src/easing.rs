//! Easing functions required by §4.4. Each takes and returns a fraction in
//! `[0, 1]`; `Shifting` never applies one (its index arithmetic is
//! discrete, enforced by `AnimationInstance::render`).

use std::f64::consts::PI;

use stairled_types::Easing;

const BACK_C1: f64 = 1.701_58;
const BACK_C2: f64 = BACK_C1 * 1.525;
const BACK_C3: f64 = BACK_C1 + 1.0;

pub fn apply(easing: Easing, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    match easing {
        Easing::Linear => t,
        Easing::EaseInBack => BACK_C3 * t * t * t - BACK_C1 * t * t,
        Easing::EaseOutBack => {
            let t = t - 1.0;
            1.0 + BACK_C3 * t * t * t + BACK_C1 * t * t
        }
        Easing::EaseInOutBack => {
            if t < 0.5 {
                let t2 = 2.0 * t;
                (t2 * t2 * ((BACK_C2 + 1.0) * t2 - BACK_C2)) / 2.0
            } else {
                let t2 = 2.0 * t - 2.0;
                (t2 * t2 * ((BACK_C2 + 1.0) * t2 + BACK_C2) + 2.0) / 2.0
            }
        }
        Easing::EaseInElastic => {
            if t == 0.0 || t == 1.0 {
                t
            } else {
                let c4 = (2.0 * PI) / 3.0;
                -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
            }
        }
        Easing::EaseOutElastic => {
            if t == 0.0 || t == 1.0 {
                t
            } else {
                let c4 = (2.0 * PI) / 3.0;
                2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
            }
        }
        Easing::EaseInOutElastic => {
            if t == 0.0 || t == 1.0 {
                t
            } else {
                let c5 = (2.0 * PI) / 4.5;
                if t < 0.5 {
                    -(2f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0
                } else {
                    (2f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0 + 1.0
                }
            }
        }
        Easing::EaseInBounce => 1.0 - ease_out_bounce(1.0 - t),
        Easing::EaseOutBounce => ease_out_bounce(t),
        Easing::EaseInOutBounce => {
            if t < 0.5 {
                (1.0 - ease_out_bounce(1.0 - 2.0 * t)) / 2.0
            } else {
                (1.0 + ease_out_bounce(2.0 * t - 1.0)) / 2.0
            }
        }
    }
}

fn ease_out_bounce(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_identity() {
        assert_eq!(apply(Easing::Linear, 0.0), 0.0);
        assert_eq!(apply(Easing::Linear, 0.5), 0.5);
        assert_eq!(apply(Easing::Linear, 1.0), 1.0);
    }

    #[test]
    fn all_easings_anchor_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseInBack,
            Easing::EaseOutBack,
            Easing::EaseInOutBack,
            Easing::EaseInElastic,
            Easing::EaseOutElastic,
            Easing::EaseInOutElastic,
            Easing::EaseInBounce,
            Easing::EaseOutBounce,
            Easing::EaseInOutBounce,
        ] {
            assert!((apply(easing, 0.0)).abs() < 1e-9, "{easing:?} at 0");
            assert!((apply(easing, 1.0) - 1.0).abs() < 1e-9, "{easing:?} at 1");
        }
    }
}
