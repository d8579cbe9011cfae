//! # 코디네이터 상태 기계와 드라이버
//!
//! 타이밍 정책의 주인입니다. "언제, 무엇을" Document Store에 보낼지
//! 여기서만 결정합니다.
//!
//! 두 층으로 나뉩니다:
//! - `AutoSaveCoordinator`: 상태 기계 그 자체. 모든 연산이 일반 메서드라
//!   테스트에서 타이머 없이 직접 구동할 수 있습니다.
//! - `AutoSaveHandle` + 드라이버 태스크: 타이머(`tokio::time`)와 명령
//!   채널을 소유하는 실제 실행 환경. 핸들을 드롭하면 태스크와 타이머가
//!   함께 정리되므로, 해체된 코디네이터를 향해 타이머가 발화할 수 없습니다.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep_until, Duration, Instant, MissedTickBehavior};

use super::draft::{FieldDelta, SessionDraft};
use super::store::{DocumentStore, StoreError};

/// 타이밍 설정
///
/// 기준 동작: 디바운스 5초, 주기 저장 5초(5~30초 권장 범위),
/// "저장됨" 표시 2초, 에러 쿨다운 10초.
#[derive(Debug, Clone)]
pub struct AutoSaveConfig {
    /// 마지막 편집 후 이만큼 조용하면 저장 (trailing-edge 디바운스)
    pub debounce: Duration,
    /// 주기 저장 간격 — 연속 편집으로 디바운스가 계속 미뤄질 때의 안전망
    pub interval: Duration,
    /// 저장 성공 표시를 유지하는 시간 (saved → idle)
    pub saved_display: Duration,
    /// 저장 실패 후 재시도를 허용하기까지의 쿨다운 (error → idle)
    pub error_cooldown: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(5),
            interval: Duration::from_secs(5),
            saved_display: Duration::from_secs(2),
            error_cooldown: Duration::from_secs(10),
        }
    }
}

/// 코디네이터 상태 — 편집 화면이 그대로 렌더링하는 값입니다.
///
/// `idle → saving → { saved → idle, error → idle }`
#[derive(Debug, Clone, PartialEq)]
pub enum AutoSaveStatus {
    Idle,
    Saving,
    /// 서버가 보고한 저장 시각을 담습니다
    Saved { last_saved: String },
    Error { message: String },
}

/// 자동 저장 상태 기계
///
/// 편집 세션 하나당 인스턴스 하나가 `pendingDocument`(여기서는
/// `pending`)와 `remote_id`를 배타적으로 소유합니다.
pub struct AutoSaveCoordinator {
    store: Arc<dyn DocumentStore>,
    config: AutoSaveConfig,
    /// 최신 편집 스냅샷 — 저장 실패가 있어도 절대 버리지 않습니다
    pending: SessionDraft,
    /// 마지막으로 저장에 성공한 스냅샷의 핑거프린트
    last_persisted: Option<String>,
    /// Document Store가 부여한 id. 최초 create 성공 전에는 None
    remote_id: Option<String>,
    status: AutoSaveStatus,
    /// 상태 변화를 구독자에게 즉시 알리는 채널.
    /// 저장 발송 직전의 `saving` 전이도 여기로 발행됩니다.
    status_tx: watch::Sender<AutoSaveStatus>,
    /// 디바운스 마감 시각 — 편집마다 교체(재장전)됩니다
    debounce_deadline: Option<Instant>,
    /// saved/error 표시가 idle로 돌아가는 시각
    status_deadline: Option<Instant>,
    /// Authorization 에러 후 true — 이 편집 세션에서는 더 저장하지 않음
    fatal: bool,
}

impl AutoSaveCoordinator {
    /// 새 편집 세션의 코디네이터를 만듭니다.
    ///
    /// 기존 세션을 여는 경우 `remote_id`에 서버 id를 넘기면
    /// 첫 저장부터 부분 업데이트 경로를 탑니다.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        initial: SessionDraft,
        remote_id: Option<String>,
        config: AutoSaveConfig,
    ) -> Self {
        // 방금 연 문서는 "저장된 상태"에서 출발합니다 — 편집 전에는
        // 주기 타이머가 아무것도 보내지 않아야 하므로.
        let last_persisted = remote_id.as_ref().map(|_| initial.fingerprint());
        let (status_tx, _) = watch::channel(AutoSaveStatus::Idle);
        Self {
            store,
            config,
            pending: initial,
            last_persisted,
            remote_id,
            status: AutoSaveStatus::Idle,
            status_tx,
            debounce_deadline: None,
            status_deadline: None,
            fatal: false,
        }
    }

    pub fn status(&self) -> &AutoSaveStatus {
        &self.status
    }

    /// 상태 변화 구독 — 편집 화면이 표시 갱신에 사용합니다.
    pub fn subscribe(&self) -> watch::Receiver<AutoSaveStatus> {
        self.status_tx.subscribe()
    }

    /// 모든 상태 전이는 이 함수를 거칩니다: 필드 갱신 + 구독자 알림.
    /// 저장이 await에 들어가기 전에 `saving`이 먼저 관측 가능해집니다.
    fn set_status(&mut self, status: AutoSaveStatus) {
        if self.status != status {
            self.status = status.clone();
            self.status_tx.send_replace(status);
        }
    }

    pub fn pending(&self) -> &SessionDraft {
        &self.pending
    }

    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    /// 저장되지 않은 변경이 있는가 (핑거프린트 비교)
    pub fn has_unsaved_changes(&self) -> bool {
        self.last_persisted.as_deref() != Some(self.pending.fingerprint().as_str())
    }

    /// 다음 디바운스 마감 시각 — 드라이버가 타이머를 걸 때 사용합니다.
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce_deadline
    }

    /// 다음 상태 전이(saved/error → idle) 시각
    pub fn status_deadline(&self) -> Option<Instant> {
        self.status_deadline
    }

    /// 편집 이벤트: 델타를 병합하고 디바운스 타이머를 재장전합니다.
    ///
    /// 저장소에는 접촉하지 않습니다. 이전에 걸린 디바운스는 취소되고
    /// 새 마감으로 교체됩니다 — 연속 편집 중에는 마지막 편집만이
    /// 저장을 트리거합니다 (trailing-edge).
    pub fn on_edit(&mut self, delta: FieldDelta) {
        self.pending.apply(delta);
        self.debounce_deadline = Some(Instant::now() + self.config.debounce);
    }

    /// 디바운스 마감 도달: 타이머를 풀고 저장을 시도합니다.
    pub async fn on_debounce_elapsed(&mut self) {
        self.debounce_deadline = None;
        self.save().await;
    }

    /// 주기 타이머 틱: 핑거프린트가 바뀐 경우에만 저장합니다.
    ///
    /// 진행 중(saving)이거나 에러 쿨다운 중이면 건너뜁니다 —
    /// 이미 저장 중인데 또 저장하거나, 실패 직후 자동으로 재시도해서
    /// 같은 에러를 반복하는 일을 막는 가드입니다.
    pub async fn on_periodic_tick(&mut self) {
        if matches!(
            self.status,
            AutoSaveStatus::Saving | AutoSaveStatus::Error { .. }
        ) {
            return;
        }
        self.save().await;
    }

    /// 명시적 "저장" 동작: 걸려 있는 디바운스를 취소하고 즉시 저장합니다.
    pub async fn force_save(&mut self) {
        self.debounce_deadline = None;
        self.save().await;
    }

    /// 이탈(내비게이션/프로세스 종료) 신호.
    ///
    /// 타이머를 모두 취소하고, 미저장 변경 + 제목이 있으면 best-effort
    /// 저장을 **한 번** 발사합니다. 결과는 기다리지 않고(JoinHandle 드롭),
    /// 실패해도 재시도하지 않습니다 — 호출한 쪽 프로세스는 확인 전에
    /// 종료될 수 있습니다.
    pub fn on_suspend(&mut self) {
        self.debounce_deadline = None;
        self.status_deadline = None;

        if self.fatal || !self.pending.has_title() || !self.has_unsaved_changes() {
            return;
        }

        let store = Arc::clone(&self.store);
        match self.remote_id.clone() {
            Some(id) => {
                let patch = self.pending.autosave_payload();
                tokio::spawn(async move {
                    let _ = store.autosave(&id, &patch).await;
                });
            }
            None => {
                let payload = self.pending.create_payload();
                tokio::spawn(async move {
                    let _ = store.create(&payload).await;
                });
            }
        }
    }

    /// saved/error 표시 시간이 지나면 idle로 되돌립니다.
    ///
    /// Authorization 에러는 되돌리지 않습니다 — 치명적 상태 유지.
    pub fn decay_status(&mut self) {
        self.status_deadline = None;
        if self.fatal {
            return;
        }
        if matches!(
            self.status,
            AutoSaveStatus::Saved { .. } | AutoSaveStatus::Error { .. }
        ) {
            self.set_status(AutoSaveStatus::Idle);
        }
    }

    /// 저장 알고리즘 — 디바운스/주기/강제 경로가 공유합니다.
    ///
    /// 1. 제목이 비어 있으면 조용히 건너뜀 (제목 없는 문서는 저장 금지)
    /// 2. 핑거프린트가 그대로면 건너뜀 (중복 쓰기 없음 — 멱등성)
    /// 3. remote_id가 없으면 create, 있으면 autosave 부분 업데이트
    /// 4. 성공: 발송한 스냅샷의 핑거프린트를 기록하고 saved 표시
    /// 5. 실패: error 표시 + 쿨다운. 대기 중인 편집은 그대로 유지되어
    ///    다음 성공한 저장이 실패분을 자연히 대체합니다 (백오프/큐 없음)
    pub async fn save(&mut self) {
        if self.fatal || !self.pending.has_title() {
            return;
        }

        let fingerprint = self.pending.fingerprint();
        if self.last_persisted.as_deref() == Some(fingerprint.as_str()) {
            return;
        }

        // 발송 전에 전이를 발행합니다 — 요청이 오래 걸려도
        // 구독자는 저장 중임을 바로 볼 수 있습니다.
        self.set_status(AutoSaveStatus::Saving);
        self.status_deadline = None;

        let result = match self.remote_id.clone() {
            None => self
                .store
                .create(&self.pending.create_payload())
                .await
                .map(|ack| {
                    // id를 포착한 뒤로는 항상 부분 업데이트 경로
                    self.remote_id = Some(ack.id);
                    ack.last_saved
                }),
            Some(id) => self
                .store
                .autosave(&id, &self.pending.autosave_payload())
                .await
                .map(|ack| ack.last_saved),
        };

        match result {
            Ok(last_saved) => {
                // 발송 시점의 핑거프린트만 기록합니다. 저장 중에 큐에 쌓인
                // 편집은 아직 반영 전이므로 다음 트리거가 잡아냅니다.
                self.last_persisted = Some(fingerprint);
                self.set_status(AutoSaveStatus::Saved { last_saved });
                self.status_deadline = Some(Instant::now() + self.config.saved_display);
            }
            Err(StoreError::Authorization) => {
                self.fatal = true;
                self.set_status(AutoSaveStatus::Error {
                    message: StoreError::Authorization.to_string(),
                });
                self.status_deadline = None;
            }
            Err(err) => {
                self.set_status(AutoSaveStatus::Error {
                    message: err.to_string(),
                });
                self.status_deadline = Some(Instant::now() + self.config.error_cooldown);
            }
        }
    }
}

// ── 드라이버 ──

/// 드라이버 태스크로 보내는 명령
#[derive(Debug)]
enum Command {
    Edit(FieldDelta),
    ForceSave,
    Suspend,
}

/// 실행 중인 코디네이터의 핸들
///
/// 편집 화면은 이 핸들로 편집 이벤트를 흘려보내고 상태를 구독합니다.
/// 핸들이 드롭되면 드라이버 태스크가 종료되고 타이머도 함께 사라집니다
/// (플러시 없는 해체 — 플러시가 필요하면 `suspend()`를 호출).
pub struct AutoSaveHandle {
    tx: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<AutoSaveStatus>,
}

impl AutoSaveHandle {
    /// 드라이버 태스크를 띄우고 핸들을 반환합니다.
    pub fn spawn(
        store: Arc<dyn DocumentStore>,
        initial: SessionDraft,
        remote_id: Option<String>,
        config: AutoSaveConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let coordinator = AutoSaveCoordinator::new(store, initial, remote_id, config);
        // 코디네이터가 상태 채널을 소유하므로, saving처럼 한 select 암
        // 안에서 일어나는 전이도 발송 즉시 구독자에게 보입니다.
        let status_rx = coordinator.subscribe();
        tokio::spawn(run(coordinator, rx));

        Self { tx, status_rx }
    }

    /// 필드 편집 이벤트를 전달합니다 (블로킹 없음).
    pub fn edit(&self, delta: FieldDelta) {
        let _ = self.tx.send(Command::Edit(delta));
    }

    /// 명시적 저장을 요청합니다.
    pub fn force_save(&self) {
        let _ = self.tx.send(Command::ForceSave);
    }

    /// 이탈 신호: best-effort 저장 후 드라이버를 종료합니다.
    pub fn suspend(&self) {
        let _ = self.tx.send(Command::Suspend);
    }

    /// 현재 상태 스냅샷
    pub fn status(&self) -> AutoSaveStatus {
        self.status_rx.borrow().clone()
    }

    /// 상태 변화를 기다립니다 (표시 갱신용).
    pub async fn status_changed(&mut self) -> AutoSaveStatus {
        // 송신측(드라이버)이 죽었으면 마지막 상태를 그대로 반환
        let _ = self.status_rx.changed().await;
        self.status_rx.borrow().clone()
    }
}

/// 드라이버 루프 — 타이머와 명령을 하나의 태스크에서 직렬로 처리합니다.
///
/// 저장을 인라인으로 await하므로 발송이 겹치지 않습니다(직렬화).
/// 저장 중 도착한 명령은 채널에 쌓였다가 순서대로 병합됩니다.
async fn run(mut coordinator: AutoSaveCoordinator, mut rx: mpsc::UnboundedReceiver<Command>) {
    let period = coordinator.config.interval;
    // 첫 틱이 즉시 발화하지 않도록 한 주기 뒤에서 시작합니다
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let debounce = coordinator.debounce_deadline();
        let decay = coordinator.status_deadline();

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Edit(delta)) => coordinator.on_edit(delta),
                Some(Command::ForceSave) => coordinator.force_save().await,
                Some(Command::Suspend) => {
                    coordinator.on_suspend();
                    break;
                }
                // 핸들 드롭 = 편집 세션 해체. 타이머는 태스크와 함께 사라짐
                None => break,
            },
            _ = sleep_until(debounce.unwrap_or_else(Instant::now)), if debounce.is_some() => {
                coordinator.on_debounce_elapsed().await;
            }
            _ = ticker.tick() => coordinator.on_periodic_tick().await,
            _ = sleep_until(decay.unwrap_or_else(Instant::now)), if decay.is_some() => {
                coordinator.decay_status();
            }
        }
    }
}
