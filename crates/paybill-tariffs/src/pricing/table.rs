//! Price table lookup and interpolation
//!
//! Amounts above a table's last range fall into virtual ranges that continue
//! the last range's width, so any amount above a table's first bound has a
//! position in it as long as the range stays within Decimal range.

use paybill_common::{PriceTable, PriceTableRange, TariffError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

type Result<T> = std::result::Result<T, TariffError>;

/// Find the range containing `amount` (`from < amount <= to`), extrapolating
/// past the end of the table.
///
/// Amounts at or below the first range's lower bound have no bracket and are
/// reported as `NotFound`.
pub fn locate(table: &PriceTable, amount: Decimal) -> Result<PriceTableRange> {
    table.validate()?;

    if let Some(range) = table.ranges.iter().find(|r| r.contains(amount)) {
        return Ok(*range);
    }

    let first = &table.ranges[0];
    if amount <= first.from {
        return Err(TariffError::not_found(
            "price range",
            format!("{} is below table {} starting at {}", amount, table.region, first.from),
        ));
    }

    let last = last_range(table)?;
    let delta = width(table, last)?;
    let step = amount
        .checked_sub(last.to)
        .and_then(|beyond| beyond.checked_div(delta))
        .map(|steps| steps.ceil())
        .ok_or_else(|| out_of_range(table, amount))?;
    let offset = step
        .to_u32()
        .ok_or_else(|| out_of_range(table, amount))?;
    let position = last
        .position
        .checked_add(offset)
        .ok_or_else(|| out_of_range(table, amount))?;
    let shift = delta
        .checked_mul(step)
        .ok_or_else(|| out_of_range(table, amount))?;
    let from = last
        .from
        .checked_add(shift)
        .ok_or_else(|| out_of_range(table, amount))?;
    let to = last
        .to
        .checked_add(shift)
        .ok_or_else(|| out_of_range(table, amount))?;

    Ok(PriceTableRange::new(from, to, position))
}

/// Range at `position` in `table`, extrapolated when the position lies
/// past the end of the table
pub fn map_position(table: &PriceTable, position: u32) -> Result<PriceTableRange> {
    table.validate()?;

    if let Some(range) = table.ranges.get(position as usize) {
        return Ok(*range);
    }

    let last = last_range(table)?;
    let delta = width(table, last)?;
    let step = Decimal::from(position - last.position);
    let overflow =
        || TariffError::invalid_table(&table.region, format!("position {} overflows", position));
    let from = delta
        .checked_mul(step)
        .and_then(|shift| last.from.checked_add(shift))
        .ok_or_else(overflow)?;
    let to = from.checked_add(delta).ok_or_else(overflow)?;

    Ok(PriceTableRange::new(from, to, position))
}

/// Map `amount` from its source range onto the target range.
///
/// `ratio = (source.to - amount) / width(source)`, with `0` replaced by `1`
/// and `1` replaced by `0` before scaling into the target.
pub fn interpolate(source: &PriceTableRange, target: &PriceTableRange, amount: Decimal) -> Result<Decimal> {
    let unusable = |range: &PriceTableRange, what: &str| {
        TariffError::invalid_table(
            "price range",
            format!("cannot interpolate {} over {} .. {}", what, range.from, range.to),
        )
    };

    let mut ratio = source
        .width()
        .and_then(|width| source.to.checked_sub(amount)?.checked_div(width))
        .ok_or_else(|| unusable(source, "from"))?;

    if ratio.is_zero() {
        ratio = Decimal::ONE;
    } else if ratio == Decimal::ONE {
        ratio = Decimal::ZERO;
    }

    target
        .width()
        .and_then(|width| width.checked_mul(ratio))
        .and_then(|offset| target.from.checked_add(offset))
        .ok_or_else(|| unusable(target, "onto"))
}

fn last_range(table: &PriceTable) -> Result<&PriceTableRange> {
    table
        .last_range()
        .ok_or_else(|| TariffError::invalid_table(&table.region, "table has no ranges"))
}

fn width(table: &PriceTable, range: &PriceTableRange) -> Result<Decimal> {
    range
        .width()
        .ok_or_else(|| TariffError::invalid_table(&table.region, "range is too wide"))
}

fn out_of_range(table: &PriceTable, amount: Decimal) -> TariffError {
    TariffError::not_found(
        "price range",
        format!("{} is too far beyond table {}", amount, table.region),
    )
}
