//! Canonical dataset identities.
//!
//! File names in the archive embed the scenario tag (`historical`,
//! `ssp370`, `ssp370-GWL2K`). Statistics for every scenario of one logical
//! dataset are stored under the same cleaned name.

use once_cell::sync::Lazy;
use regex::Regex;

static HISTORICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"_historical_").expect("valid regex"));
static SSP_GWL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_ssp\d{3}-GWL\dK_").expect("valid regex"));
static SSP: Lazy<Regex> = Lazy::new(|| Regex::new(r"_ssp\d{3}_").expect("valid regex"));

/// Strip scenario tags and the file extension from a dataset file name.
///
/// `x_historical_y.nc`, `x_ssp370-GWL2K_y.nc` and `x_ssp370_y.nc` all map to
/// `x_y`.
pub fn clean_name(file_name: &str) -> String {
    let cleaned = HISTORICAL.replace_all(file_name, "_");
    let cleaned = SSP_GWL.replace_all(&cleaned, "_");
    let cleaned = SSP.replace_all(&cleaned, "_");
    strip_extension(&cleaned).to_string()
}

/// File name without its final extension. Dots inside the stem survive.
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && !file_name[idx..].contains('/') => &file_name[..idx],
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_variants_share_a_canonical_name() {
        assert_eq!(clean_name("x_historical_y.nc"), "x_y");
        assert_eq!(clean_name("x_ssp370-GWL2K_y.nc"), "x_y");
        assert_eq!(clean_name("x_ssp370_y.nc"), "x_y");
    }

    #[test]
    fn realistic_archive_names_merge() {
        let hist = "CEU-3_MPI-M-MPI-ESM-LR_historical_r1i1p1_CLMcom-BTU-CCLM_1hr_CF_Wind.nc";
        let gwl = "CEU-3_MPI-M-MPI-ESM-LR_ssp370-GWL3K_r1i1p1_CLMcom-BTU-CCLM_1hr_CF_Wind.nc";
        assert_eq!(clean_name(hist), clean_name(gwl));
        assert_eq!(
            clean_name(hist),
            "CEU-3_MPI-M-MPI-ESM-LR_r1i1p1_CLMcom-BTU-CCLM_1hr_CF_Wind"
        );
    }

    #[test]
    fn names_without_tags_only_lose_the_extension() {
        assert_eq!(clean_name("plain_name.csv"), "plain_name");
        assert_eq!(clean_name("no_extension"), "no_extension");
    }
}
