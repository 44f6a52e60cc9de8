//! Heuristic detection of pip packages a Python snippet probably needs
//!
//! The remote executor has no virtualenv lockfile to consult before running
//! arbitrary generated code, so it falls back to scanning the source text for
//! well-known import names and mapping them to pip specifiers.

/// (source substring, pip specifier) pairs, checked against the lower-cased source.
const KNOWN_PACKAGES: &[(&str, &str)] = &[
    ("pandas", "pandas>=2.0"),
    ("numpy", "numpy>=1.24"),
    ("matplotlib", "matplotlib>=3.7"),
    ("reportlab", "reportlab>=4.0"),
    ("seaborn", "seaborn>=0.12"),
    ("scipy", "scipy>=1.10"),
    ("sklearn", "scikit-learn>=1.2"),
    ("requests", "requests>=2.28"),
    ("beautifulsoup4", "beautifulsoup4>=4.12"),
    ("bs4", "beautifulsoup4>=4.12"),
    ("opencv", "opencv-python>=4.7"),
    ("cv2", "opencv-python>=4.7"),
    ("plotly", "plotly>=5.14"),
    ("openpyxl", "openpyxl>=3.1"),
    ("xlrd", "xlrd>=2.0"),
];

/// Markers that indicate the snippet manages its own dependencies, in which
/// case auto-install should be skipped entirely.
const SELF_MANAGING_MARKERS: &[&str] = &["pip install", "pip3 install", "venv.create", "virtualenv"];

/// Scan `source` and return the deduplicated list of pip specifiers implied
/// by the tokens it references. Returns an empty list if the source appears
/// to manage its own environment.
pub fn detect_requirements(source: &str) -> Vec<String> {
    let lower = source.to_lowercase();

    if SELF_MANAGING_MARKERS.iter().any(|m| lower.contains(m)) {
        return Vec::new();
    }

    let mut found = Vec::new();
    for (token, package) in KNOWN_PACKAGES {
        if lower.contains(token) && !found.contains(package) {
            found.push((*package).to_string());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_tokens() {
        let source = "import pandas as pd\nimport numpy as np\nprint(pd.DataFrame())";
        let reqs = detect_requirements(source);
        assert!(reqs.contains(&"pandas>=2.0".to_string()));
        assert!(reqs.contains(&"numpy>=1.24".to_string()));
    }

    #[test]
    fn dedupes_aliases() {
        let source = "import cv2\nimport bs4\nfrom bs4 import BeautifulSoup";
        let reqs = detect_requirements(source);
        assert_eq!(reqs.iter().filter(|r| r.starts_with("beautifulsoup4")).count(), 1);
        assert!(reqs.iter().any(|r| r.starts_with("opencv-python")));
    }

    #[test]
    fn skips_self_managing_sources() {
        let source = "import os\nos.system('pip install pandas')\nimport pandas";
        assert!(detect_requirements(source).is_empty());
    }

    #[test]
    fn empty_when_no_known_tokens() {
        let source = "print('hello world')";
        assert!(detect_requirements(source).is_empty());
    }
}
