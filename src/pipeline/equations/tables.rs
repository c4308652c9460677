//! Lookup tables for the equation rules.

use once_cell::sync::Lazy;
use regex::Regex;

/// TeX command (without the backslash) for a Greek letter.
///
/// Capitals that look like Latin letters are not listed here; see
/// [`latin_lookalike`].
pub(crate) fn greek_command(c: char) -> Option<&'static str> {
    let name = match c {
        'α' => "alpha",
        'β' => "beta",
        'γ' => "gamma",
        'δ' => "delta",
        'ε' | 'ϵ' => "epsilon",
        'ζ' => "zeta",
        'η' => "eta",
        'θ' => "theta",
        'ϑ' => "vartheta",
        'ι' => "iota",
        'κ' => "kappa",
        'λ' => "lambda",
        'μ' => "mu",
        'ν' => "nu",
        'ξ' => "xi",
        'π' => "pi",
        'ϖ' => "varpi",
        'ρ' => "rho",
        'ϱ' => "varrho",
        'σ' => "sigma",
        'ς' => "varsigma",
        'τ' => "tau",
        'υ' => "upsilon",
        'φ' | 'ϕ' => "phi",
        'χ' => "chi",
        'ψ' => "psi",
        'ω' => "omega",
        'Γ' => "Gamma",
        'Δ' => "Delta",
        'Θ' => "Theta",
        'Λ' => "Lambda",
        'Ξ' => "Xi",
        'Π' => "Pi",
        'Σ' => "Sigma",
        'Υ' => "Upsilon",
        'Φ' => "Phi",
        'Ψ' => "Psi",
        'Ω' => "Omega",
        _ => return None,
    };
    Some(name)
}

/// Greek capitals that render identically to a Latin one.
///
/// Lowercase omicron is left alone: standalone it is the Greek article, far
/// more common in quoted Greek than as a mistyped `o`.
pub(crate) fn latin_lookalike(c: char) -> Option<char> {
    let latin = match c {
        '\u{391}' => 'A', // Alpha
        '\u{392}' => 'B', // Beta
        '\u{395}' => 'E', // Epsilon
        '\u{396}' => 'Z', // Zeta
        '\u{397}' => 'H', // Eta
        '\u{399}' => 'I', // Iota
        '\u{39A}' => 'K', // Kappa
        '\u{39C}' => 'M', // Mu
        '\u{39D}' => 'N', // Nu
        '\u{39F}' => 'O', // Omicron
        '\u{3A1}' => 'P', // Rho
        '\u{3A4}' => 'T', // Tau
        '\u{3A7}' => 'X', // Chi
        _ => return None,
    };
    Some(latin)
}

pub(crate) fn superscript(c: char) -> Option<char> {
    match c {
        '\u{2070}' => Some('0'),
        '\u{B9}' => Some('1'),
        '\u{B2}' => Some('2'),
        '\u{B3}' => Some('3'),
        '\u{2074}'..='\u{2079}' => char::from_digit(c as u32 - 0x2070, 10),
        '\u{207A}' => Some('+'),
        '\u{207B}' => Some('-'),
        _ => None,
    }
}

pub(crate) fn subscript(c: char) -> Option<char> {
    match c {
        '\u{2080}'..='\u{2089}' => char::from_digit(c as u32 - 0x2080, 10),
        '\u{208A}' => Some('+'),
        '\u{208B}' => Some('-'),
        _ => None,
    }
}

/// Well-known equations as they are typed in prose, with their TeX form.
///
/// Matched in table order at each position; boundaries are checked by the
/// caller, so patterns carry no anchors.
pub(crate) static FAMOUS_EQUATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // Mass–energy equivalence
        (r"E[ \t]*=[ \t]*mc(?:\^2|²|2)", "E = mc^2"),
        // Newton's second law
        (r"F[ \t]*=[ \t]*ma", "F = ma"),
        // Ideal gas law
        (r"PV[ \t]*=[ \t]*nRT", "PV = nRT"),
        // Pythagorean theorem
        (
            r"a(?:\^2|²)[ \t]*\+[ \t]*b(?:\^2|²)[ \t]*=[ \t]*c(?:\^2|²)",
            "a^2 + b^2 = c^2",
        ),
        // Pythagorean trigonometric identity
        (
            r"sin(?:\^2|²)[ \t]*(?:θ|\\theta)[ \t]*\+[ \t]*cos(?:\^2|²)[ \t]*(?:θ|\\theta)[ \t]*=[ \t]*1",
            r"\sin^2\theta + \cos^2\theta = 1",
        ),
        // Wave speed
        (r"v[ \t]*=[ \t]*f[ \t]*(?:λ|\\lambda)", r"v = f\lambda"),
        // Heisenberg uncertainty, reduced Planck constant
        (
            r"[Δ∆][ \t]*x[ \t]*[Δ∆][ \t]*p[ \t]*(?:≥|>=)[ \t]*ħ[ \t]*/[ \t]*2",
            r"\Delta x \Delta p \geq \frac{\hbar}{2}",
        ),
        // Heisenberg uncertainty, h over 4π
        (
            r"[Δ∆][ \t]*x[ \t]*[Δ∆][ \t]*p[ \t]*(?:≥|>=)[ \t]*h[ \t]*/[ \t]*(?:4[ \t]*π|\([ \t]*4[ \t]*π[ \t]*\))",
            r"\Delta x \Delta p \geq \frac{h}{4\pi}",
        ),
    ]
    .into_iter()
    .map(|(pattern, tex)| (Regex::new(pattern).unwrap(), tex))
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_digits() {
        assert_eq!(superscript('²'), Some('2'));
        assert_eq!(superscript('⁷'), Some('7'));
        assert_eq!(superscript('⁻'), Some('-'));
        assert_eq!(subscript('₀'), Some('0'));
        assert_eq!(subscript('₉'), Some('9'));
        assert_eq!(subscript('2'), None);
    }

    #[test]
    fn lookalikes_are_not_commands() {
        for c in "\u{391}\u{392}\u{395}\u{396}\u{397}\u{399}\u{39A}\u{39C}\u{39D}\u{39F}\u{3A1}\u{3A4}\u{3A7}".chars() {
            assert!(latin_lookalike(c).is_some(), "{c}");
            assert!(greek_command(c).is_none(), "{c}");
        }
    }

    #[test]
    fn lowercase_omicron_is_not_a_lookalike() {
        assert_eq!(latin_lookalike('\u{3BF}'), None);
        assert_eq!(greek_command('\u{3BF}'), None);
    }

    #[test]
    fn famous_table_compiles() {
        assert_eq!(FAMOUS_EQUATIONS.len(), 8);
    }
}
