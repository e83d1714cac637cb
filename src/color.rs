//! Color types used throughout the pipeline.
//!
//! Every color stored in a [`Point`](crate::Point), a
//! [`VoxelRecord`](crate::VoxelRecord) or a voxel table is on the [0, 1]
//! scale. Palette statistics and block matching work on the 0-255 scale, so
//! conversion happens at that boundary through [`Rgb::to_255`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }

    /// Colour on the 0-255 scale, e.g. an average taken from 8-bit texels.
    pub fn from_255(c: [f64; 3]) -> Self {
        Self::new(c[0] / 255.0, c[1] / 255.0, c[2] / 255.0)
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Scale to 0-255, clipping out-of-range channels.
    pub fn to_255(self) -> [f64; 3] {
        [
            (self.r * 255.0).clamp(0.0, 255.0),
            (self.g * 255.0).clamp(0.0, 255.0),
            (self.b * 255.0).clamp(0.0, 255.0),
        ]
    }

    pub fn to_u8(self) -> [u8; 3] {
        let c = self.to_255();
        [c[0].round() as u8, c[1].round() as u8, c[2].round() as u8]
    }

    pub fn distance(self, other: Rgb) -> f64 {
        distance3(self.to_array(), other.to_array())
    }

    pub fn to_lab(self) -> Lab {
        Lab::from_rgb255(self.to_255())
    }
}

pub(crate) fn distance3(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

/// CIE L*a*b* colour (D65 white point).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

const XN: f64 = 95.047;
const YN: f64 = 100.0;
const ZN: f64 = 108.883;

impl Lab {
    /// Convert an sRGB colour given on the 0-255 scale.
    pub fn from_rgb255(rgb: [f64; 3]) -> Self {
        let lin = |c: f64| {
            let c = c.clamp(0.0, 255.0) / 255.0;
            let c = if c > 0.04045 {
                ((c + 0.055) / 1.055).powf(2.4)
            } else {
                c / 12.92
            };
            c * 100.0
        };
        let (r, g, b) = (lin(rgb[0]), lin(rgb[1]), lin(rgb[2]));

        let x = r * 0.4124564 + g * 0.3575761 + b * 0.1804375;
        let y = r * 0.2126729 + g * 0.7151522 + b * 0.0721750;
        let z = r * 0.0193339 + g * 0.1191920 + b * 0.9503041;

        let f = |t: f64| {
            if t > 0.008856 {
                t.cbrt()
            } else {
                7.787 * t + 16.0 / 116.0
            }
        };
        let (fx, fy, fz) = (f(x / XN), f(y / YN), f(z / ZN));

        Lab {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }

    /// Inverse of [`Lab::from_rgb255`], clipped to the sRGB gamut and returned
    /// on the [0, 1] scale.
    pub fn to_rgb(&self) -> Rgb {
        let fy = (self.l + 16.0) / 116.0;
        let fx = self.a / 500.0 + fy;
        let fz = fy - self.b / 200.0;
        let f_inv = |t: f64| {
            let t3 = t * t * t;
            if t3 > 0.008856 {
                t3
            } else {
                (t - 16.0 / 116.0) / 7.787
            }
        };
        let x = f_inv(fx) * XN / 100.0;
        let y = f_inv(fy) * YN / 100.0;
        let z = f_inv(fz) * ZN / 100.0;

        let r = x * 3.2404542 - y * 1.5371385 - z * 0.4985314;
        let g = -x * 0.9692660 + y * 1.8760108 + z * 0.0415560;
        let b = x * 0.0556434 - y * 0.2040259 + z * 1.0572252;

        let gamma = |c: f64| {
            let c = if c > 0.0031308 {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            } else {
                12.92 * c
            };
            c.clamp(0.0, 1.0)
        };
        Rgb::new(gamma(r), gamma(g), gamma(b))
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.l, self.a, self.b]
    }

    /// CIEDE2000 colour difference. `k_l` weights lightness; chroma and hue
    /// weights are 1.
    pub fn delta_e_2000(&self, other: &Lab, k_l: f64) -> f64 {
        const POW25_7: f64 = 6_103_515_625.0;

        let c1 = self.a.hypot(self.b);
        let c2 = other.a.hypot(other.b);
        let c_bar = (c1 + c2) * 0.5;
        let c_bar7 = c_bar.powi(7);
        let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

        let a1p = (1.0 + g) * self.a;
        let a2p = (1.0 + g) * other.a;
        let c1p = a1p.hypot(self.b);
        let c2p = a2p.hypot(other.b);

        let hue = |b: f64, ap: f64| {
            if b == 0.0 && ap == 0.0 {
                0.0
            } else {
                let h = b.atan2(ap).to_degrees();
                if h < 0.0 {
                    h + 360.0
                } else {
                    h
                }
            }
        };
        let h1p = hue(self.b, a1p);
        let h2p = hue(other.b, a2p);

        let dl = other.l - self.l;
        let dc = c2p - c1p;
        let chroma_product = c1p * c2p;

        let dh = if chroma_product == 0.0 {
            0.0
        } else {
            let d = h2p - h1p;
            if d > 180.0 {
                d - 360.0
            } else if d < -180.0 {
                d + 360.0
            } else {
                d
            }
        };
        let d_big_h = 2.0 * chroma_product.sqrt() * (dh.to_radians() * 0.5).sin();

        let l_bar = (self.l + other.l) * 0.5;
        let c_bar_p = (c1p + c2p) * 0.5;
        let h_bar = if chroma_product == 0.0 {
            h1p + h2p
        } else if (h1p - h2p).abs() <= 180.0 {
            (h1p + h2p) * 0.5
        } else if h1p + h2p < 360.0 {
            (h1p + h2p + 360.0) * 0.5
        } else {
            (h1p + h2p - 360.0) * 0.5
        };

        let t = 1.0 - 0.17 * (h_bar - 30.0).to_radians().cos()
            + 0.24 * (2.0 * h_bar).to_radians().cos()
            + 0.32 * (3.0 * h_bar + 6.0).to_radians().cos()
            - 0.20 * (4.0 * h_bar - 63.0).to_radians().cos();

        let d_theta = 30.0 * (-((h_bar - 275.0) / 25.0).powi(2)).exp();
        let c_bar_p7 = c_bar_p.powi(7);
        let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();
        let l50 = (l_bar - 50.0).powi(2);
        let s_l = 1.0 + 0.015 * l50 / (20.0 + l50).sqrt();
        let s_c = 1.0 + 0.045 * c_bar_p;
        let s_h = 1.0 + 0.015 * c_bar_p * t;
        let r_t = -(2.0 * d_theta).to_radians().sin() * r_c;

        let tl = dl / (k_l * s_l);
        let tc = dc / s_c;
        let th = d_big_h / s_h;
        (tl * tl + tc * tc + th * th + r_t * tc * th).max(0.0).sqrt()
    }
}
