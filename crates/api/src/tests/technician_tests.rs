// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use repairhub_domain::{GeoPoint, VerificationStatus};

use super::helpers::{
    create_test_admin, create_test_context, create_test_technician_actor, create_test_user,
};
use crate::{
    ApiError, AvailabilityRequest, RegisterTechnicianRequest, UpdateTechnicianProfileRequest,
    VerificationRequest, own_profile, register_technician, set_availability, update_profile,
    verify_technician,
};

fn registration(specializations: &[&str]) -> RegisterTechnicianRequest {
    RegisterTechnicianRequest {
        specializations: specializations.iter().map(ToString::to_string).collect(),
        experience_years: 3,
        location: Some(GeoPoint::new(12.97, 77.59)),
    }
}

#[tokio::test]
async fn test_registration_defaults() {
    let test = create_test_context();
    let actor = create_test_technician_actor(50);

    let technician = register_technician(
        &test.ctx,
        &actor,
        registration(&[" mobile ", "", "laptop"]),
    )
    .await
    .expect("Registration should succeed");

    assert_eq!(technician.user_id, 50);
    assert_eq!(technician.specializations, vec!["mobile", "laptop"]);
    assert_eq!(technician.verification_status, VerificationStatus::Pending);
    assert!(technician.is_available);
    assert!(!technician.is_online);
    assert_eq!(technician.completed_repairs, 0);
    assert_eq!(technician.commission_rate, None);

    let duplicate = register_technician(&test.ctx, &actor, registration(&["tablet"])).await;
    assert!(matches!(duplicate, Err(ApiError::Conflict { .. })));
}

#[tokio::test]
async fn test_registration_requires_technician_role_and_specialization() {
    let test = create_test_context();

    let by_user =
        register_technician(&test.ctx, &create_test_user(10), registration(&["mobile"])).await;
    assert!(matches!(by_user, Err(ApiError::Forbidden { .. })));

    let empty = register_technician(
        &test.ctx,
        &create_test_technician_actor(50),
        registration(&["  "]),
    )
    .await;
    assert!(matches!(empty, Err(ApiError::Validation { .. })));
}

#[tokio::test]
async fn test_verification_transitions() {
    let test = create_test_context();
    let technician = register_technician(
        &test.ctx,
        &create_test_technician_actor(50),
        registration(&["mobile"]),
    )
    .await
    .expect("Registration should succeed");
    let admin = create_test_admin();

    let by_technician = verify_technician(
        &test.ctx,
        &create_test_technician_actor(50),
        technician.technician_id,
        VerificationRequest {
            status: VerificationStatus::Approved,
        },
    )
    .await;
    assert!(matches!(by_technician, Err(ApiError::Forbidden { .. })));

    let rejected = verify_technician(
        &test.ctx,
        &admin,
        technician.technician_id,
        VerificationRequest {
            status: VerificationStatus::Rejected,
        },
    )
    .await
    .expect("Rejection should succeed");
    assert_eq!(rejected.verification_status, VerificationStatus::Rejected);

    let approved = verify_technician(
        &test.ctx,
        &admin,
        technician.technician_id,
        VerificationRequest {
            status: VerificationStatus::Approved,
        },
    )
    .await
    .expect("A rejected technician may be approved later");
    assert_eq!(approved.verification_status, VerificationStatus::Approved);

    let back_to_pending = verify_technician(
        &test.ctx,
        &admin,
        technician.technician_id,
        VerificationRequest {
            status: VerificationStatus::Pending,
        },
    )
    .await;
    assert!(matches!(back_to_pending, Err(ApiError::Conflict { .. })));

    let missing = verify_technician(
        &test.ctx,
        &admin,
        999,
        VerificationRequest {
            status: VerificationStatus::Approved,
        },
    )
    .await;
    assert!(matches!(missing, Err(ApiError::NotFound { .. })));
}

#[tokio::test]
async fn test_profile_update_and_availability() {
    let test = create_test_context();
    let actor = create_test_technician_actor(50);

    let missing_profile = own_profile(&test.ctx, &actor).await;
    assert!(matches!(missing_profile, Err(ApiError::Forbidden { .. })));

    register_technician(&test.ctx, &actor, registration(&["mobile"]))
        .await
        .expect("Registration should succeed");

    let updated = update_profile(
        &test.ctx,
        &actor,
        UpdateTechnicianProfileRequest {
            specializations: Some(vec![String::from("tablet"), String::from("mobile")]),
            experience_years: Some(7),
            is_online: Some(true),
            location: None,
        },
    )
    .await
    .expect("Profile update should succeed");
    assert_eq!(updated.specializations, vec!["tablet", "mobile"]);
    assert_eq!(updated.experience_years, 7);
    assert!(updated.is_online);
    assert_eq!(updated.verification_status, VerificationStatus::Pending);
    assert!(updated.location.is_some());

    let empty = update_profile(
        &test.ctx,
        &actor,
        UpdateTechnicianProfileRequest {
            specializations: Some(Vec::new()),
            ..UpdateTechnicianProfileRequest::default()
        },
    )
    .await;
    assert!(matches!(empty, Err(ApiError::Validation { .. })));

    let unavailable = set_availability(
        &test.ctx,
        &actor,
        AvailabilityRequest {
            is_available: false,
        },
    )
    .await
    .expect("Availability change should succeed");
    assert!(!unavailable.is_available);

    let profile = own_profile(&test.ctx, &actor)
        .await
        .expect("Profile should load");
    assert!(!profile.is_available);
    assert_eq!(profile.technician_id, updated.technician_id);
}
