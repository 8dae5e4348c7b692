//! Bundle planning logic.

use uuid::Uuid;

use super::error::BundleError;
use super::types::{BundleMode, BundlePlan, LineForBundle, PlannedSchedule, SiblingSchedule};

/// Prefix stamped on bundle product codes.
const BUNDLE_CODE_PREFIX: &str = "BNDL-";

/// Stateless bundle planner.
pub struct BundlePlanner;

impl BundlePlanner {
    /// Derives the deterministic operation key for a request.
    ///
    /// Line ids are sorted so key equality is insensitive to selection order;
    /// two requests over the same (deposit, lines, schedule, mode) tuple are
    /// the same operation.
    #[must_use]
    pub fn operation_key(
        deposit_id: Uuid,
        line_item_ids: &[Uuid],
        base_schedule_id: Uuid,
        mode: BundleMode,
    ) -> String {
        let mut sorted: Vec<Uuid> = line_item_ids.to_vec();
        sorted.sort();
        sorted.dedup();
        let lines = sorted
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{deposit_id}:{lines}:{base_schedule_id}:{}", mode.as_str())
    }

    /// Validates preconditions and computes the full plan.
    ///
    /// # Errors
    ///
    /// - `AlreadyAllocated` if any selected line carries an applied match
    /// - `UnsafeReplacement` if `soft_delete_old` would replace schedules
    ///   that still hold applied matches anywhere
    /// - `NoLines` / `EmptyWindow` for degenerate input
    pub fn plan(
        deposit_id: Uuid,
        lines: &[LineForBundle],
        base_schedule_id: Uuid,
        base_product_code: &str,
        base_product_name: &str,
        window: &[SiblingSchedule],
        mode: BundleMode,
    ) -> Result<BundlePlan, BundleError> {
        if lines.is_empty() {
            return Err(BundleError::NoLines);
        }
        if window.is_empty() {
            return Err(BundleError::EmptyWindow);
        }

        let allocated: Vec<Uuid> = lines
            .iter()
            .filter(|l| l.has_applied_match)
            .map(|l| l.id)
            .collect();
        if !allocated.is_empty() {
            return Err(BundleError::AlreadyAllocated { line_ids: allocated });
        }

        if mode == BundleMode::SoftDeleteOld {
            let blocked: Vec<Uuid> = window
                .iter()
                .filter(|s| s.applied_match_count > 0)
                .map(|s| s.id)
                .collect();
            if !blocked.is_empty() {
                return Err(BundleError::UnsafeReplacement {
                    schedule_ids: blocked,
                });
            }
        }

        let mut ordered_window: Vec<&SiblingSchedule> = window.iter().collect();
        ordered_window.sort_by_key(|s| (s.schedule_date, s.id));

        let line_ids: Vec<Uuid> = lines.iter().map(|l| l.id).collect();
        let operation_key = Self::operation_key(deposit_id, &line_ids, base_schedule_id, mode);

        let schedules: Vec<PlannedSchedule> = lines
            .iter()
            .flat_map(|line| {
                ordered_window.iter().map(move |sibling| PlannedSchedule {
                    line_item_id: line.id,
                    schedule_date: sibling.schedule_date,
                    expected_usage: line.usage,
                    expected_commission: line.commission,
                    replaces_schedule_id: sibling.id,
                })
            })
            .collect();

        let soft_delete_schedule_ids = if mode == BundleMode::SoftDeleteOld {
            ordered_window.iter().map(|s| s.id).collect()
        } else {
            Vec::new()
        };

        Ok(BundlePlan {
            operation_key,
            product_code: format!("{BUNDLE_CODE_PREFIX}{base_product_code}"),
            product_name: format!("{base_product_name} (bundle)"),
            schedules,
            soft_delete_schedule_ids,
        })
    }

    /// Validates that an operation's created schedules can be reversed.
    ///
    /// # Errors
    ///
    /// Returns `UnsafeUndo` if any created schedule has since accumulated an
    /// applied match.
    pub fn validate_undo(created: &[SiblingSchedule]) -> Result<(), BundleError> {
        let blocked: Vec<Uuid> = created
            .iter()
            .filter(|s| s.applied_match_count > 0)
            .map(|s| s.id)
            .collect();
        if blocked.is_empty() {
            Ok(())
        } else {
            Err(BundleError::UnsafeUndo {
                schedule_ids: blocked,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn line(name: &str, allocated: bool) -> LineForBundle {
        LineForBundle {
            id: Uuid::new_v4(),
            product_name_raw: name.to_string(),
            usage: dec!(100),
            commission: dec!(20),
            has_applied_match: allocated,
        }
    }

    fn sibling(month: u32, applied: u64) -> SiblingSchedule {
        SiblingSchedule {
            id: Uuid::new_v4(),
            schedule_date: NaiveDate::from_ymd_opt(2024, month, 15).unwrap(),
            applied_match_count: applied,
        }
    }

    #[test]
    fn test_operation_key_is_order_insensitive() {
        let deposit = Uuid::new_v4();
        let schedule = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let k1 = BundlePlanner::operation_key(deposit, &[a, b], schedule, BundleMode::KeepOld);
        let k2 = BundlePlanner::operation_key(deposit, &[b, a], schedule, BundleMode::KeepOld);
        assert_eq!(k1, k2);

        let k3 =
            BundlePlanner::operation_key(deposit, &[a, b], schedule, BundleMode::SoftDeleteOld);
        assert_ne!(k1, k3);
    }

    #[test]
    fn test_plan_creates_line_times_window_schedules() {
        let deposit = Uuid::new_v4();
        let base = Uuid::new_v4();
        let lines = vec![line("Widget A", false), line("Widget B", false)];
        let window = vec![sibling(3, 0), sibling(4, 0), sibling(5, 0)];

        let plan = BundlePlanner::plan(
            deposit,
            &lines,
            base,
            "WGT-100",
            "Widget Suite",
            &window,
            BundleMode::KeepOld,
        )
        .unwrap();

        assert_eq!(plan.schedules.len(), 6);
        assert_eq!(plan.product_code, "BNDL-WGT-100");
        assert!(plan.soft_delete_schedule_ids.is_empty());
        // Line order preserved, window date-ordered within each line.
        assert_eq!(plan.schedules[0].line_item_id, lines[0].id);
        assert_eq!(plan.schedules[3].line_item_id, lines[1].id);
        assert!(plan.schedules[0].schedule_date < plan.schedules[1].schedule_date);
    }

    #[test]
    fn test_allocated_line_blocks_with_no_side_effects() {
        let lines = vec![line("Widget A", false), line("Widget B", true)];
        let window = vec![sibling(3, 0)];

        let result = BundlePlanner::plan(
            Uuid::new_v4(),
            &lines,
            Uuid::new_v4(),
            "WGT-100",
            "Widget Suite",
            &window,
            BundleMode::KeepOld,
        );

        assert!(matches!(
            result,
            Err(BundleError::AlreadyAllocated { ref line_ids }) if line_ids == &vec![lines[1].id]
        ));
    }

    #[test]
    fn test_soft_delete_requires_unallocated_window() {
        let lines = vec![line("Widget A", false)];
        let window = vec![sibling(3, 0), sibling(4, 2)];

        let result = BundlePlanner::plan(
            Uuid::new_v4(),
            &lines,
            Uuid::new_v4(),
            "WGT-100",
            "Widget Suite",
            &window,
            BundleMode::SoftDeleteOld,
        );

        assert!(matches!(
            result,
            Err(BundleError::UnsafeReplacement { ref schedule_ids })
                if schedule_ids == &vec![window[1].id]
        ));
    }

    #[test]
    fn test_keep_old_tolerates_allocated_window() {
        let lines = vec![line("Widget A", false)];
        let window = vec![sibling(3, 2)];

        let plan = BundlePlanner::plan(
            Uuid::new_v4(),
            &lines,
            Uuid::new_v4(),
            "WGT-100",
            "Widget Suite",
            &window,
            BundleMode::KeepOld,
        )
        .unwrap();
        assert_eq!(plan.schedules.len(), 1);
    }

    #[test]
    fn test_soft_delete_lists_window() {
        let lines = vec![line("Widget A", false)];
        let window = vec![sibling(3, 0), sibling(4, 0)];

        let plan = BundlePlanner::plan(
            Uuid::new_v4(),
            &lines,
            Uuid::new_v4(),
            "WGT-100",
            "Widget Suite",
            &window,
            BundleMode::SoftDeleteOld,
        )
        .unwrap();
        assert_eq!(plan.soft_delete_schedule_ids.len(), 2);
    }

    #[test]
    fn test_undo_validation() {
        let clean = vec![sibling(3, 0)];
        assert!(BundlePlanner::validate_undo(&clean).is_ok());

        let dirty = vec![sibling(3, 0), sibling(4, 1)];
        assert!(matches!(
            BundlePlanner::validate_undo(&dirty),
            Err(BundleError::UnsafeUndo { ref schedule_ids }) if schedule_ids.len() == 1
        ));
    }
}
