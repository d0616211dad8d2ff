use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use comap_smart_home::{
    ComapClient, Config, Coordinator, Entity, Error, HvacMode, Instruction, Integration, Options,
    Write,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const THERMAL: &str = "/thermal/housings/h1/thermal-details";
const OVERRIDE_Z1: &str = "/thermal/housings/h1/zones/z1/temporary-instruction";

fn thermal_details(state: &str) -> Value {
    json!({
        "heating_system_state": state,
        "services_available": "all",
        "events": {},
        "zones": [
            {
                "id": "z1",
                "title": "Salon",
                "set_point_type": "defined_temperature",
                "set_point": { "instruction": "presence_1" },
                "temperature": 19.5,
                "heating_status": "heating",
                "last_presence_detected": "2024-01-10T08:00:00Z",
                "connected_objects": ["SN-T1"]
            },
            {
                "id": "z2",
                "title": "Chambre",
                "set_point_type": "pilot_wire",
                "set_point": { "instruction": "eco" },
                "events": {
                    "temporary_instruction": { "set_point": { "instruction": "comfort" } }
                },
                "connected_objects": []
            }
        ]
    })
}

async fn mount_get(server: &MockServer, p: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Everything a refresh reads, except the thermal details.
async fn mount_static_reads(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AuthenticationResult": { "AccessToken": "tok", "ExpiresIn": 3600 }
        })))
        .mount(server)
        .await;
    mount_get(server, "/park/housings", json!([{ "id": "h1", "name": "Maison" }])).await;
    mount_get(
        server,
        "/thermal/housings/h1/custom-temperatures",
        json!({ "night": 17.0, "away": 16.0, "connected": { "presence_1": 20.5 } }),
    )
    .await;
    mount_get(
        server,
        "/park/housings/h1/connected-objects",
        json!([
            { "serial_number": "SN-T1", "model": "thermostat", "communication_status": "available",
              "voltage_percent": 90.0 },
            { "serial_number": "SN-GW", "model": "gateway", "communication_status": "available" }
        ]),
    )
    .await;
    mount_get(
        server,
        "/thermal/housings/h1/programs",
        json!({ "programs": [{ "id": "p1", "title": "Hiver", "is_activated": true }] }),
    )
    .await;
    mount_get(
        server,
        "/thermal/housings/h1/programs/active",
        json!({ "id": "p1", "title": "Hiver", "is_activated": true,
                "zones": [{ "id": "z1", "schedule_id": "s1" }] }),
    )
    .await;
    mount_get(
        server,
        "/thermal/housings/h1/schedules",
        json!([{ "id": "s1", "title": "Semaine" }, { "id": "s2", "title": "Vacances" }]),
    )
    .await;
}

fn client(server: &MockServer) -> ComapClient {
    let config = Config::new("me@example.com", "secret")
        .api_url(server.uri())
        .auth_url(format!("{}/auth", server.uri()));
    ComapClient::builder(config).build().unwrap()
}

async fn coordinator(server: &MockServer) -> Coordinator {
    Coordinator::builder(client(server))
        .first_refresh()
        .await
        .expect("first refresh should succeed")
}

#[tokio::test]
async fn first_refresh_builds_snapshot() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    mount_get(&server, THERMAL, thermal_details("on")).await;

    let coordinator = coordinator(&server).await;
    let snapshot = coordinator.snapshot();

    assert_eq!(snapshot.housing.name, "Maison");
    assert_eq!(snapshot.zones().len(), 2);
    assert_eq!(snapshot.connected_objects.len(), 2);
    assert_eq!(snapshot.schedules.len(), 2);
    assert_eq!(snapshot.active_program.zones[0].schedule_id, "s1");
    // housing state copied into every zone
    assert!(snapshot
        .zones()
        .iter()
        .all(|z| z.heating_system_state == snapshot.heating_system_state()));
    let ids: Vec<_> = snapshot.custom_temperatures.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["night", "away", "presence_1"]);
}

#[tokio::test]
async fn first_refresh_failure_aborts() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = Coordinator::builder(client(&server))
        .first_refresh()
        .await
        .err()
        .expect("setup should fail");
    assert!(
        matches!(err, Error::RefreshFailed { read: "thermal_details", .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermal_details("on")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let mut coordinator = coordinator(&server).await;
    let store = coordinator.store();
    let before = coordinator.snapshot();

    let err = coordinator.refresh().await.unwrap_err();
    match err {
        Error::RefreshFailed { read, source } => {
            assert_eq!(read, "thermal_details");
            assert!(matches!(*source, Error::Api { status: 502, .. }));
        }
        other => panic!("expected RefreshFailed, got {other:?}"),
    }
    assert!(Arc::ptr_eq(&before, &coordinator.snapshot()));
    assert!(!store.last_update_success());
}

const READS: [(&str, &str); 7] = [
    ("custom_temperatures", "/thermal/housings/h1/custom-temperatures"),
    ("housing", "/park/housings"),
    ("connected_objects", "/park/housings/h1/connected-objects"),
    ("thermal_details", THERMAL),
    ("programs", "/thermal/housings/h1/programs"),
    ("active_program", "/thermal/housings/h1/programs/active"),
    ("schedules", "/thermal/housings/h1/schedules"),
];

#[tokio::test]
async fn any_failed_read_keeps_previous_snapshot() {
    for (read, read_path) in READS {
        let server = MockServer::start().await;
        mount_static_reads(&server).await;
        mount_get(&server, THERMAL, thermal_details("on")).await;

        let mut coordinator = coordinator(&server).await;
        let before = coordinator.snapshot();

        Mock::given(method("GET"))
            .and(path(read_path))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .with_priority(1)
            .mount(&server)
            .await;

        let err = coordinator.refresh().await.unwrap_err();
        match err {
            Error::RefreshFailed { read: failed, source } => {
                assert_eq!(failed, read);
                assert!(matches!(*source, Error::Api { status: 500, .. }), "{read}: {source:?}");
            }
            other => panic!("{read}: expected RefreshFailed, got {other:?}"),
        }
        assert!(Arc::ptr_eq(&before, &coordinator.snapshot()), "{read}");
        assert!(!coordinator.store().last_update_success(), "{read}");
    }
}

#[tokio::test]
async fn refresh_publishes_and_notifies() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermal_details("on")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_get(&server, THERMAL, thermal_details("off")).await;

    let updates = Arc::new(AtomicUsize::new(0));
    let updates_clone = updates.clone();
    let mut coordinator = Coordinator::builder(client(&server))
        .on_update(move |s| {
            assert!(s.zones().iter().all(|z| z.heating_system_state.is_some()));
            updates_clone.fetch_add(1, Ordering::SeqCst);
        })
        .first_refresh()
        .await
        .unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 0);

    coordinator.refresh().await.unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 1);
    assert_eq!(
        coordinator.snapshot().heating_system_state(),
        Some(comap_smart_home::HeatingSystemState::Off)
    );
}

#[tokio::test]
async fn write_triggers_exactly_one_refresh() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermal_details("on")))
        .expect(2)
        .mount(&server)
        .await;
    // response already carries fresh state; it must not replace the refresh
    Mock::given(method("POST"))
        .and(path(OVERRIDE_Z1))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermal_details("off")))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = coordinator(&server).await;
    coordinator
        .dispatch(Write::TemporaryInstruction {
            zone_id: "z1".to_string(),
            instruction: Instruction::Temperature(21.0),
            duration_minutes: None,
        })
        .await
        .unwrap();
    assert_eq!(
        coordinator.snapshot().heating_system_state(),
        Some(comap_smart_home::HeatingSystemState::On)
    );
}

#[tokio::test]
async fn failed_write_skips_refresh() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermal_details("on")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/thermal/housings/h1/heating-system"))
        .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
        .mount(&server)
        .await;

    let mut coordinator = coordinator(&server).await;
    let err = coordinator
        .dispatch(Write::HeatingSystem(false))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::CommandFailed { action: "turn_off", .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn refresh_failure_after_write_is_not_a_command_failure() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermal_details("on")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/thermal/housings/h1/absence"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = coordinator(&server).await;
    coordinator.dispatch(Write::Holiday(true)).await.unwrap();
    assert!(!coordinator.store().last_update_success());
}

// -- Integration --

async fn integration(server: &MockServer) -> Integration {
    Integration::with_client(client(server), Options::default())
        .await
        .expect("setup should succeed")
}

#[tokio::test]
async fn zero_update_interval_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let options = Options {
        update_interval: std::time::Duration::ZERO,
        ..Options::default()
    };
    let err = Integration::with_client(client(&server), options)
        .await
        .err()
        .expect("setup should fail");
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[tokio::test]
async fn integration_exposes_entities() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    mount_get(&server, THERMAL, thermal_details("on")).await;

    let integration = integration(&server).await;
    assert!(integration.entity("z1").is_some());
    assert!(integration.entity("h1_z1_presence").is_some());
    assert!(integration.entity("h1_z2_presence").is_none());

    let Some(Entity::Thermostat(salon)) = integration.entity("z1") else {
        panic!("z1 should be a thermostat");
    };
    assert_eq!(salon.target_temperature(), Some(20.5));
    assert_eq!(salon.hvac_mode(), Some(HvacMode::Auto));

    let Some(Entity::Thermostat(chambre)) = integration.entity("z2") else {
        panic!("z2 should be a thermostat");
    };
    assert_eq!(chambre.hvac_mode(), Some(HvacMode::Heat));
}

#[tokio::test]
async fn entity_command_round_trip() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermal_details("on")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/thermal/housings/h1/zones/z2/temporary-instruction"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let integration = integration(&server).await;
    let Some(Entity::Thermostat(chambre)) = integration.entity("z2") else {
        panic!("z2 should be a thermostat");
    };
    let mut coordinator = integration.lock().await;
    chambre
        .set_hvac_mode(&mut coordinator, HvacMode::Auto)
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_preset_never_reaches_the_network() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    Mock::given(method("GET"))
        .and(path(THERMAL))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermal_details("on")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/thermal/housings/h1/zones/z2/temporary-instruction"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let integration = integration(&server).await;
    let Some(Entity::Thermostat(chambre)) = integration.entity("z2") else {
        panic!("z2 should be a thermostat");
    };
    let mut coordinator = integration.lock().await;
    let err = chambre
        .set_preset_mode(&mut coordinator, "turbo")
        .await
        .unwrap_err();
    assert!(err.is_usage_error());
}

#[tokio::test]
async fn service_uses_zone_override_duration() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    mount_get(&server, THERMAL, thermal_details("on")).await;
    Mock::given(method("POST"))
        .and(path(OVERRIDE_Z1))
        .and(body_json(json!({ "set_point": { "instruction": 22.0 }, "duration": 45 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(OVERRIDE_Z1))
        .and(body_json(json!({ "set_point": { "instruction": "presence_1" }, "duration": 10 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let integration = integration(&server).await;
    let Some(Entity::OverrideDuration(timer)) = integration.entity("z1_timer") else {
        panic!("z1_timer should be an override duration");
    };
    timer.set_value_str("00:45").unwrap();

    integration
        .set_temporary_instruction("z1_temporary", Instruction::Temperature(22.0), None)
        .await
        .unwrap();
    integration
        .set_temporary_instruction("z1", Instruction::from("presence_1"), Some(10))
        .await
        .unwrap();
}

#[tokio::test]
async fn service_rejects_unresolvable_targets() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    mount_get(&server, THERMAL, thermal_details("on")).await;

    let integration = integration(&server).await;

    let err = integration
        .set_temporary_instruction("nope", Instruction::Temperature(20.0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownEntity(ref id) if id == "nope"));

    // housing-scoped entities have no zone
    let err = integration
        .set_temporary_instruction("h1_on_off", Instruction::Temperature(20.0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownZone(_)));

    // gateway is not claimed by any zone
    let err = integration
        .set_temporary_instruction("h1_h1_gateway_SN-GW", Instruction::Temperature(20.0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownZone(_)));
}

#[tokio::test]
async fn polling_task_refreshes_periodically() {
    let server = MockServer::start().await;
    mount_static_reads(&server).await;
    mount_get(&server, THERMAL, thermal_details("on")).await;

    let options = Options {
        update_interval: std::time::Duration::from_millis(50),
        ..Options::default()
    };
    let integration = Integration::with_client(client(&server), options)
        .await
        .unwrap();

    let refreshes = Arc::new(AtomicUsize::new(0));
    let refreshes_clone = refreshes.clone();
    integration.subscribe(move |_| {
        refreshes_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(
        integration.lock().await.update_interval(),
        std::time::Duration::from_millis(50)
    );

    let poller = integration.spawn_polling();
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert!(!poller.is_finished());
    poller.abort();

    assert!(refreshes.load(Ordering::SeqCst) >= 2);
    assert!(integration.last_update_success());
}
