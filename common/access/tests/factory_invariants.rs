use common_access::{
    in_department, Authority, Department, GeographicScope, GeographyTable, RoleConfigurationFactory, RoleName, RoleSelection,
};

fn selectors() -> Vec<RoleSelection> {
    let provinces = [None, Some("nakhon-ratchasima"), Some("nakhon-sawan"), Some("unknown"), Some(" ")];
    let branches = [None, Some("0450"), Some("NMA003"), Some("NSN001"), Some("NSN003"), Some("ZZZ999")];
    let departments = std::iter::once(None).chain(Department::ALL.into_iter().map(Some));
    let departments: Vec<_> = departments.collect();

    let mut out = Vec::new();
    for role in RoleName::ALL {
        for province in provinces {
            for branch in branches {
                for department in &departments {
                    out.push(RoleSelection {
                        role,
                        province_id: province.map(String::from),
                        branch_id: branch.map(String::from),
                        department: *department,
                    });
                }
            }
        }
    }
    out
}

#[test]
fn every_built_profile_satisfies_invariants() {
    let geo = GeographyTable::builtin();
    let factory = RoleConfigurationFactory::new(geo);
    for selection in selectors() {
        let profile = factory.build(&selection);
        if let Err(err) = profile.validate(geo) {
            panic!("{selection:?} produced invalid profile: {err}");
        }
        let g = profile.geographic();
        if profile.authority().is_management() {
            assert_eq!(g.scope(), GeographicScope::All);
            assert!(profile.permissions().is_wildcard());
        }
        if g.scope() == GeographicScope::Branch {
            assert!(!g.allowed_branches().is_empty());
            for b in g.allowed_branches() {
                assert!(g.allowed_provinces().contains(geo.province_of(b).unwrap()));
            }
        }
        if let Some(home) = g.home_branch() {
            assert!(g.allowed_branches().contains(home), "{selection:?}");
        }
        if let Some(dept) = selection.role.spec().default_department {
            assert_eq!(profile.departments().len(), 1, "{selection:?}");
            assert!(in_department(&profile, dept), "{selection:?}");
        }
        assert!(profile.is_active());
    }
}

#[test]
fn role_table_authority_is_carried_over() {
    let factory = RoleConfigurationFactory::builtin();
    for role in RoleName::ALL {
        let profile = factory.build(&RoleSelection::new(role));
        assert_eq!(profile.authority(), role.spec().authority);
        if profile.authority() != Authority::Pending {
            assert_eq!(profile.geographic().scope(), role.spec().scope);
        }
    }
}
