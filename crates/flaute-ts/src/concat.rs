use flaute_core::{FlauteError, FlauteResult, GridDataset};
use ndarray::{concatenate, Axis};

/// Join datasets of one variable on the same grid along time, in order.
pub fn concat_time(parts: &[GridDataset]) -> FlauteResult<GridDataset> {
    let first = parts
        .first()
        .ok_or_else(|| FlauteError::Other("nothing to concatenate".into()))?;
    for part in &parts[1..] {
        if part.variable != first.variable
            || part.ny() != first.ny()
            || part.nx() != first.nx()
        {
            return Err(FlauteError::Precondition(format!(
                "cannot concatenate {} ({}x{}) with {} ({}x{})",
                first.variable,
                first.ny(),
                first.nx(),
                part.variable,
                part.ny(),
                part.nx()
            )));
        }
    }
    let views: Vec<_> = parts.iter().map(|p| p.values.view()).collect();
    let values = concatenate(Axis(0), &views)
        .map_err(|err| FlauteError::Other(format!("concatenating cubes: {err}")))?;
    let times = parts.iter().flat_map(|p| p.times.iter().copied()).collect();
    GridDataset::new(first.variable.clone(), times, values)
}
