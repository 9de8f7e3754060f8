use proptest::prelude::*;
use spiritfield_system_stats::{ModifiableStat, Modifier};

fn modifier() -> impl Strategy<Value = Modifier> {
    (
        -20.0_f32..20.0,
        -50.0_f32..200.0,
        proptest::option::of(0.25_f32..4.0),
    )
        .prop_map(|(flat_bonus, percent_bonus, multiplier)| Modifier {
            flat_bonus,
            percent_bonus,
            multiplier,
        })
}

proptest! {
    #[test]
    fn removing_every_modifier_restores_the_base(
        base in -100.0_f32..100.0,
        modifiers in proptest::collection::vec(modifier(), 0..8),
    ) {
        let mut stat = ModifiableStat::new(base, None, None);
        let handles: Vec<_> = modifiers.iter().map(|m| stat.add_modifier(*m)).collect();
        for handle in handles.into_iter().rev() {
            prop_assert!(stat.remove_modifier(handle));
        }
        prop_assert_eq!(stat.value(), base);
    }

    #[test]
    fn single_modifier_matches_formula(base in -100.0_f32..100.0, m in modifier()) {
        let mut stat = ModifiableStat::new(base, None, None);
        let _ = stat.add_modifier(m);
        let expected = (base + m.flat_bonus)
            * (1.0 + m.percent_bonus / 100.0)
            * m.multiplier.unwrap_or(1.0);
        prop_assert!((stat.value() - expected).abs() <= expected.abs() * 1e-5 + 1e-4);
    }

    #[test]
    fn removing_one_modifier_matches_never_adding_it(
        base in -100.0_f32..100.0,
        modifiers in proptest::collection::vec(modifier(), 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let removed = pick.index(modifiers.len());
        let mut stat = ModifiableStat::new(base, None, None);
        let handles: Vec<_> = modifiers.iter().map(|m| stat.add_modifier(*m)).collect();
        prop_assert!(stat.remove_modifier(handles[removed]));
        prop_assert!(!stat.remove_modifier(handles[removed]));

        let mut fresh = ModifiableStat::new(base, None, None);
        let mut scale = base.abs();
        let mut percent = 100.0;
        let mut product = 1.0;
        for (index, m) in modifiers.iter().enumerate() {
            if index != removed {
                let _ = fresh.add_modifier(*m);
            }
            scale += m.flat_bonus.abs();
            percent += m.percent_bonus.abs();
            product *= m.multiplier.unwrap_or(1.0);
        }
        let tolerance = scale * (percent / 100.0) * product * 1e-5 + 1e-4;
        prop_assert_eq!(stat.modifier_count(), modifiers.len() - 1);
        prop_assert!((stat.value() - fresh.value()).abs() <= tolerance);
    }
}
