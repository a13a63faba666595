//! Nuclear targets: isotopes, natural elements and multi-element compounds.

use crate::error::AppError;
use crate::units::{FM, M_NUCLEON};

/// Natural isotope compositions: `(A, abundance, spin, ⟨S_p⟩, ⟨S_n⟩)`.
type IsotopeRow = (u32, f64, f64, f64, f64);

const NATURAL_ELEMENTS: &[(&str, u32, &[IsotopeRow])] = &[
    ("O", 8, &[(16, 0.99757, 0.0, 0.0, 0.0), (17, 0.00038, 2.5, 0.0, 0.5), (18, 0.00205, 0.0, 0.0, 0.0)]),
    ("F", 9, &[(19, 1.0, 0.5, 0.4751, -0.0087)]),
    ("Na", 11, &[(23, 1.0, 1.5, 0.2477, 0.0198)]),
    ("Al", 13, &[(27, 1.0, 2.5, 0.3430, 0.0296)]),
    (
        "Si",
        14,
        &[(28, 0.92223, 0.0, 0.0, 0.0), (29, 0.04685, 0.5, 0.0054, 0.1334), (30, 0.03092, 0.0, 0.0, 0.0)],
    ),
    (
        "Ar",
        18,
        &[(36, 0.003336, 0.0, 0.0, 0.0), (38, 0.000629, 0.0, 0.0, 0.0), (40, 0.996035, 0.0, 0.0, 0.0)],
    ),
    (
        "Ca",
        20,
        &[
            (40, 0.96941, 0.0, 0.0, 0.0),
            (42, 0.00647, 0.0, 0.0, 0.0),
            (43, 0.00135, 3.5, 0.0, 0.5),
            (44, 0.02086, 0.0, 0.0, 0.0),
            (46, 0.00004, 0.0, 0.0, 0.0),
            (48, 0.00187, 0.0, 0.0, 0.0),
        ],
    ),
    (
        "Ge",
        32,
        &[
            (70, 0.2057, 0.0, 0.0, 0.0),
            (72, 0.2745, 0.0, 0.0, 0.0),
            (73, 0.0775, 4.5, 0.0310, 0.4390),
            (74, 0.3650, 0.0, 0.0, 0.0),
            (76, 0.0773, 0.0, 0.0, 0.0),
        ],
    ),
    ("I", 53, &[(127, 1.0, 2.5, 0.3090, 0.0750)]),
    (
        "Xe",
        54,
        &[
            (124, 0.00095, 0.0, 0.0, 0.0),
            (126, 0.00089, 0.0, 0.0, 0.0),
            (128, 0.01910, 0.0, 0.0, 0.0),
            (129, 0.26401, 0.5, 0.0100, 0.3290),
            (130, 0.04071, 0.0, 0.0, 0.0),
            (131, 0.21232, 1.5, -0.0090, -0.2720),
            (132, 0.26909, 0.0, 0.0, 0.0),
            (134, 0.10436, 0.0, 0.0, 0.0),
            (136, 0.08857, 0.0, 0.0, 0.0),
        ],
    ),
    (
        "W",
        74,
        &[
            (180, 0.0012, 0.0, 0.0, 0.0),
            (182, 0.2650, 0.0, 0.0, 0.0),
            (183, 0.1431, 0.5, 0.0, -0.031),
            (184, 0.3064, 0.0, 0.0, 0.0),
            (186, 0.2843, 0.0, 0.0, 0.0),
        ],
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Isotope {
    pub z: u32,
    pub a: u32,
    /// Fraction of the element's nuclei.
    pub abundance: f64,
    pub spin: f64,
    /// Proton and neutron spin expectation values.
    pub sp: f64,
    pub sn: f64,
    pub mass: f64,
}

impl Isotope {
    /// Spin-zero isotope with `mass = A · m_nucleon`.
    pub fn new(z: u32, a: u32, abundance: f64) -> Self {
        Self {
            z,
            a,
            abundance,
            spin: 0.0,
            sp: 0.0,
            sn: 0.0,
            mass: a as f64 * M_NUCLEON,
        }
    }

    pub fn with_spin(self, spin: f64, sp: f64, sn: f64) -> Self {
        Self { spin, sp, sn, ..self }
    }

    /// Helm form factor (Lewin & Smith parameters) at momentum transfer `q`.
    pub fn helm_form_factor(&self, q: f64) -> f64 {
        let a = 0.52 * FM;
        let s = 0.9 * FM;
        let c = (1.23 * (self.a as f64).cbrt() - 0.6) * FM;
        let r = (c * c + 7.0 / 3.0 * std::f64::consts::PI.powi(2) * a * a - 5.0 * s * s).sqrt();
        let qr = q * r;
        // 3 j₁(x) / x, expanded near zero where the closed form cancels.
        let bessel = if qr < 1e-3 {
            1.0 - qr * qr / 10.0
        } else {
            3.0 * (qr.sin() - qr * qr.cos()) / qr.powi(3)
        };
        bessel * (-(q * s).powi(2) / 2.0).exp()
    }
}

/// A chemical element as a mixture of isotopes.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub symbol: String,
    pub isotopes: Vec<Isotope>,
}

impl Element {
    pub fn new(symbol: impl Into<String>, isotopes: Vec<Isotope>) -> Result<Self, AppError> {
        let symbol = symbol.into();
        if isotopes.is_empty() {
            return Err(AppError::empty(format!("Element {symbol} has no isotopes.")));
        }
        let total: f64 = isotopes.iter().map(|i| i.abundance).sum();
        if isotopes.iter().any(|i| !(i.abundance >= 0.0)) || !(total > 0.0) {
            return Err(AppError::config(format!("Element {symbol}: isotope abundances must be non-negative.")));
        }
        Ok(Self { symbol, isotopes })
    }

    /// Natural isotope composition by chemical symbol, abundances normalized to one.
    pub fn natural(symbol: &str) -> Result<Self, AppError> {
        let (_, z, rows) = NATURAL_ELEMENTS
            .iter()
            .find(|(s, _, _)| *s == symbol)
            .ok_or_else(|| AppError::config(format!("No nuclear data for element '{symbol}'.")))?;
        let total: f64 = rows.iter().map(|row| row.1).sum();
        let isotopes = rows
            .iter()
            .map(|&(a, abundance, spin, sp, sn)| Isotope::new(*z, a, abundance / total).with_spin(spin, sp, sn))
            .collect();
        Self::new(symbol, isotopes)
    }

    pub fn z(&self) -> u32 {
        self.isotopes[0].z
    }

    pub fn average_nuclear_mass(&self) -> f64 {
        let total: f64 = self.isotopes.iter().map(|i| i.abundance).sum();
        self.isotopes.iter().map(|i| i.abundance * i.mass).sum::<f64>() / total
    }
}

/// Elements with relative mass fractions that sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct NuclearTarget {
    elements: Vec<Element>,
    mass_fractions: Vec<f64>,
}

impl NuclearTarget {
    /// `proportions` are mass fractions when they sum to one, and
    /// stoichiometric ratios otherwise. An empty slice means one atom of each
    /// element.
    pub fn new(elements: Vec<Element>, proportions: &[f64]) -> Result<Self, AppError> {
        if elements.is_empty() {
            return Err(AppError::empty("Nuclear target needs at least one element."));
        }
        if !proportions.is_empty() && proportions.len() != elements.len() {
            return Err(AppError::config(format!(
                "Got {} proportions for {} target elements.",
                proportions.len(),
                elements.len()
            )));
        }
        if proportions.iter().any(|p| !(p.is_finite() && *p >= 0.0)) {
            return Err(AppError::config("Target proportions must be finite and non-negative."));
        }

        let total: f64 = proportions.iter().sum();
        let weights: Vec<f64> = if proportions.is_empty() || (total - 1.0).abs() > 1e-9 {
            elements
                .iter()
                .enumerate()
                .map(|(i, el)| proportions.get(i).copied().unwrap_or(1.0) * el.average_nuclear_mass())
                .collect()
        } else {
            proportions.to_vec()
        };
        let norm: f64 = weights.iter().sum();
        if !(norm > 0.0) {
            return Err(AppError::config("Target proportions must not all be zero."));
        }
        Ok(Self {
            elements,
            mass_fractions: weights.into_iter().map(|w| w / norm).collect(),
        })
    }

    pub fn single(element: Element) -> Self {
        Self {
            elements: vec![element],
            mass_fractions: vec![1.0],
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn mass_fractions(&self) -> &[f64] {
        &self.mass_fractions
    }

    /// Every isotope together with the element it belongs to.
    pub fn isotopes(&self) -> impl Iterator<Item = (&Element, &Isotope)> + '_ {
        self.elements
            .iter()
            .flat_map(|el| el.isotopes.iter().map(move |iso| (el, iso)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::MEV;
    use approx::assert_relative_eq;

    #[test]
    fn natural_elements_are_normalized() {
        for symbol in ["O", "F", "Na", "Al", "Si", "Ar", "Ca", "Ge", "I", "Xe", "W"] {
            let el = Element::natural(symbol).unwrap();
            let total: f64 = el.isotopes.iter().map(|i| i.abundance).sum();
            assert_relative_eq!(total, 1.0, max_relative = 1e-12);
        }
        let xe = Element::natural("Xe").unwrap();
        assert_eq!(xe.z(), 54);
        assert_eq!(xe.isotopes.len(), 9);
        assert!((xe.average_nuclear_mass() / M_NUCLEON - 131.3).abs() < 0.1);
        assert_eq!(Element::natural("Kr").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn helm_form_factor_is_one_at_zero_and_falls_off() {
        let xe = Isotope::new(54, 131, 1.0);
        assert_relative_eq!(xe.helm_form_factor(0.0), 1.0, max_relative = 1e-12);
        // Continuous across the small-argument expansion (q r ≈ 1e-3 near 0.04 MeV).
        let below = xe.helm_form_factor(0.030 * MEV);
        let above = xe.helm_form_factor(0.050 * MEV);
        assert!(below <= 1.0 && above < below && 1.0 - above < 1e-6);
        let q = 50.0 * MEV;
        assert!(xe.helm_form_factor(q) < 1.0 && xe.helm_form_factor(q) > xe.helm_form_factor(2.0 * q));
        let light = Isotope::new(8, 16, 1.0);
        assert!(light.helm_form_factor(q) > xe.helm_form_factor(q));
    }

    #[test]
    fn stoichiometric_ratios_become_mass_fractions() {
        let elements = vec![
            Element::natural("Ca").unwrap(),
            Element::natural("W").unwrap(),
            Element::natural("O").unwrap(),
        ];
        let target = NuclearTarget::new(elements.clone(), &[1.0, 1.0, 4.0]).unwrap();
        let masses: Vec<f64> = elements.iter().map(|e| e.average_nuclear_mass()).collect();
        let total = masses[0] + masses[1] + 4.0 * masses[2];
        assert_relative_eq!(target.mass_fractions()[1], masses[1] / total, max_relative = 1e-12);
        assert_relative_eq!(target.mass_fractions().iter().sum::<f64>(), 1.0, max_relative = 1e-12);
        assert_eq!(target.isotopes().count(), 6 + 5 + 3);

        let given = NuclearTarget::new(elements[..2].to_vec(), &[0.3, 0.7]).unwrap();
        assert_relative_eq!(given.mass_fractions()[0], 0.3, max_relative = 1e-12);
        assert_relative_eq!(given.mass_fractions()[1], 0.7, max_relative = 1e-12);
    }

    #[test]
    fn malformed_targets_are_rejected() {
        let xe = Element::natural("Xe").unwrap();
        assert_eq!(NuclearTarget::new(Vec::new(), &[]).unwrap_err().exit_code(), 3);
        assert_eq!(NuclearTarget::new(vec![xe.clone()], &[0.5, 0.5]).unwrap_err().exit_code(), 2);
        assert_eq!(NuclearTarget::new(vec![xe.clone()], &[-1.0]).unwrap_err().exit_code(), 2);
        assert_eq!(NuclearTarget::new(vec![xe], &[0.0]).unwrap_err().exit_code(), 2);
        assert!(Element::new("X", Vec::new()).is_err());
    }
}
