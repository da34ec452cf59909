//! End-to-End-Tests: zwei CallClients ueber einen echten Signaling-Server

mod common;

use common::{client, id, server_starten, warten_auf, warten_bis};
use connectly_call::{Anrufphase, CallError, Zustand};

#[tokio::test]
async fn online_liste_enthaelt_beide_clients() {
    let (adresse, _shutdown) = server_starten().await;
    let (a, _) = client(adresse, "1111").await;
    let (b, _) = client(adresse, "2222").await;

    let beide = vec![id("1111"), id("2222")];
    warten_auf(&a, |s| s.online == beide).await;
    warten_auf(&b, |s| s.online == beide).await;

    b.trennen().await;
    warten_auf(&a, |s| s.online == vec![id("1111")]).await;
    a.trennen().await;
}

#[tokio::test]
async fn anruf_wird_angenommen() {
    let (adresse, _shutdown) = server_starten().await;
    let (a, zaehler_a) = client(adresse, "1111").await;
    let (b, zaehler_b) = client(adresse, "2222").await;
    warten_auf(&a, |s| s.online.len() == 2).await;

    a.anrufen(id("2222")).await.unwrap();
    warten_auf(&a, |s| s.zustand == Zustand::Dialing).await;

    warten_auf(&b, |s| s.phase == Anrufphase::Klingelt { von: id("1111") }).await;
    b.annehmen().await.unwrap();
    warten_auf(&b, |s| s.zustand == Zustand::Active).await;

    warten_auf(&a, |s| {
        s.phase
            == Anrufphase::Verbunden {
                gegenueber: id("2222"),
            }
    })
    .await;

    // Angerufener hat das Offer des Anrufers gesetzt, Anrufer das Answer
    let offer = zaehler_b.remote_beschreibungen.lock().unwrap().clone();
    assert_eq!(offer.len(), 1);
    assert_eq!(offer[0].wert()["sdp"], "fake-offer");
    let answer = zaehler_a.remote_beschreibungen.lock().unwrap().clone();
    assert_eq!(answer.len(), 1);
    assert_eq!(answer[0].wert()["sdp"], "fake-answer");

    a.trennen().await;
    b.trennen().await;
}

#[tokio::test]
async fn ice_kandidaten_werden_ausgetauscht() {
    let (adresse, _shutdown) = server_starten().await;
    let (a, zaehler_a) = client(adresse, "1111").await;
    let (b, _) = client(adresse, "2222").await;
    warten_auf(&a, |s| s.online.len() == 2).await;

    a.anrufen(id("2222")).await.unwrap();
    warten_auf(&b, |s| s.zustand == Zustand::Ringing).await;
    b.annehmen().await.unwrap();
    warten_auf(&a, |s| s.zustand == Zustand::Active).await;

    // Kandidaten von A koennen vor dem Peer-Transport von B ankommen und
    // verworfen werden; die von B treffen A immer im Active-Zustand.
    warten_bis(|| !zaehler_a.remote_kandidaten().is_empty()).await;
    assert_eq!(
        zaehler_a.remote_kandidaten()[0].wert()["sdpMid"],
        serde_json::json!("0")
    );
    a.trennen().await;
    b.trennen().await;
}

#[tokio::test]
async fn auflegen_gibt_beide_seiten_genau_einmal_frei() {
    let (adresse, _shutdown) = server_starten().await;
    let (a, zaehler_a) = client(adresse, "1111").await;
    let (b, zaehler_b) = client(adresse, "2222").await;
    warten_auf(&a, |s| s.online.len() == 2).await;

    a.anrufen(id("2222")).await.unwrap();
    warten_auf(&b, |s| s.zustand == Zustand::Ringing).await;
    b.annehmen().await.unwrap();
    warten_auf(&a, |s| s.zustand == Zustand::Active).await;

    a.auflegen().await.unwrap();
    warten_auf(&a, |s| s.zustand == Zustand::Idle).await;
    warten_auf(&b, |s| s.zustand == Zustand::Idle).await;

    assert_eq!(zaehler_a.freigaben(), (1, 1));
    assert_eq!(zaehler_b.freigaben(), (1, 1));

    // Erneutes Auflegen ist ein lokaler Fehler und gibt nichts frei
    assert!(matches!(
        b.auflegen().await,
        Err(CallError::UngueltigerZustand { .. })
    ));
    a.trennen().await;
    b.trennen().await;
    assert_eq!(zaehler_a.freigaben(), (1, 1));
    assert_eq!(zaehler_b.freigaben(), (1, 1));
}

#[tokio::test]
async fn ablehnen_beendet_waehlen_beim_anrufer() {
    let (adresse, _shutdown) = server_starten().await;
    let (a, zaehler_a) = client(adresse, "1111").await;
    let (b, zaehler_b) = client(adresse, "2222").await;
    warten_auf(&a, |s| s.online.len() == 2).await;

    a.anrufen(id("2222")).await.unwrap();
    warten_auf(&b, |s| s.zustand == Zustand::Ringing).await;
    b.ablehnen().await.unwrap();

    warten_auf(&a, |s| s.zustand == Zustand::Idle).await;
    warten_auf(&b, |s| s.zustand == Zustand::Idle).await;
    assert_eq!(zaehler_a.freigaben(), (1, 1));
    assert_eq!(zaehler_b.anforderungen(), (0, 0));

    a.trennen().await;
    b.trennen().await;
}

#[tokio::test]
async fn anruf_an_unbekannte_identitaet_bleibt_im_waehlen() {
    let (adresse, _shutdown) = server_starten().await;
    let (a, zaehler_a) = client(adresse, "1111").await;
    warten_auf(&a, |s| s.online == vec![id("1111")]).await;

    a.anrufen(id("9999")).await.unwrap();
    warten_auf(&a, |s| s.zustand == Zustand::Dialing).await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(a.status().zustand, Zustand::Dialing);

    a.auflegen().await.unwrap();
    warten_auf(&a, |s| s.zustand == Zustand::Idle).await;
    assert_eq!(zaehler_a.freigaben(), (1, 1));
    a.trennen().await;
}

#[tokio::test]
async fn trennen_waehrend_anruf_baut_lokal_ab() {
    let (adresse, _shutdown) = server_starten().await;
    let (a, zaehler_a) = client(adresse, "1111").await;
    let (b, zaehler_b) = client(adresse, "2222").await;
    warten_auf(&a, |s| s.online.len() == 2).await;

    a.anrufen(id("2222")).await.unwrap();
    warten_auf(&b, |s| s.zustand == Zustand::Ringing).await;
    b.annehmen().await.unwrap();
    warten_auf(&a, |s| s.zustand == Zustand::Active).await;

    let status_b = b.status_abonnieren();
    b.trennen().await;
    assert!(!status_b.borrow().verbunden);
    assert_eq!(zaehler_b.freigaben(), (1, 1));

    // A erfaehrt nur ueber die user-list vom Verschwinden der Gegenseite
    warten_auf(&a, |s| s.online == vec![id("1111")]).await;
    assert_eq!(a.status().zustand, Zustand::Active);
    a.auflegen().await.unwrap();
    assert_eq!(zaehler_a.freigaben(), (1, 1));
    a.trennen().await;
}

#[tokio::test]
async fn befehl_nach_verbindungsende_ist_getrennt() {
    let (adresse, shutdown) = server_starten().await;
    let (a, _) = client(adresse, "1111").await;
    warten_auf(&a, |s| s.online.len() == 1).await;

    shutdown.send(true).unwrap();
    warten_auf(&a, |s| !s.verbunden).await;

    assert!(matches!(
        a.anrufen(id("2222")).await,
        Err(CallError::Getrennt)
    ));
}
