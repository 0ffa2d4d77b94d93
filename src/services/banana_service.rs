//! Banana tag and ripening-control persistence, calendar and summary.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::{
    db::{DbPool, is_foreign_key_violation, is_unique_violation},
    error::{AppError, FieldErrors},
    models::banana::{
        AtualizarControle, AtualizarFita, ControleBanana, ControleBananaResponse,
        FiltroControles, FitaBanana, NovaFita, NovoControle, PeriodoCalendario, ResumoStatus,
    },
    services::{
        hoje,
        maturacao::{DIAS_INICIO_COLHEITA, DIAS_LIMITE, JanelaColheita, StatusMaturacao},
        validation,
    },
};

/// Longest period the calendar accepts.
pub const MAX_DIAS_CALENDARIO: i64 = 366;

const SELECT_CONTROLE: &str = r#"
    SELECT c.id, c.fita_id, f.nome AS fita_nome, f.cor_hex AS fita_cor_hex, c.area,
           c.data_registro, c.quantidade_cachos, c.cachos_colhidos, c.observacoes,
           c.created_at, c.updated_at
    FROM controles_banana c
    JOIN fitas_banana f ON f.id = c.fita_id
"#;

fn duplicate_fita(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict("a tag with this name already exists".to_string())
    } else {
        AppError::Database(err)
    }
}

pub async fn criar_fita(pool: &DbPool, request: NovaFita) -> Result<FitaBanana, AppError> {
    let nova = request.normalizado()?;

    let fita = sqlx::query_as::<_, FitaBanana>(
        r#"
        INSERT INTO fitas_banana (nome, cor_hex, descricao, ativo)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&nova.nome)
    .bind(&nova.cor_hex)
    .bind(&nova.descricao)
    .bind(nova.ativo)
    .fetch_one(pool)
    .await
    .map_err(duplicate_fita)?;

    Ok(fita)
}

pub async fn listar_fitas(pool: &DbPool) -> Result<Vec<FitaBanana>, AppError> {
    let fitas = sqlx::query_as::<_, FitaBanana>("SELECT * FROM fitas_banana ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    Ok(fitas)
}

pub async fn buscar_fita(pool: &DbPool, id: Uuid) -> Result<FitaBanana, AppError> {
    sqlx::query_as::<_, FitaBanana>("SELECT * FROM fitas_banana WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("fita_banana"))
}

pub async fn atualizar_fita(
    pool: &DbPool,
    id: Uuid,
    request: AtualizarFita,
) -> Result<FitaBanana, AppError> {
    let atual = buscar_fita(pool, id).await?;
    let nova = request.aplicar(atual).normalizado()?;

    sqlx::query_as::<_, FitaBanana>(
        r#"
        UPDATE fitas_banana
        SET nome = $2, cor_hex = $3, descricao = $4, ativo = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&nova.nome)
    .bind(&nova.cor_hex)
    .bind(&nova.descricao)
    .bind(nova.ativo)
    .fetch_optional(pool)
    .await
    .map_err(duplicate_fita)?
    .ok_or(AppError::NotFound("fita_banana"))
}

/// Conflict when `registros` ripening registrations still use the tag.
pub fn exigir_fita_livre(registros: i64) -> Result<(), AppError> {
    if registros > 0 {
        return Err(AppError::Conflict(format!(
            "tag is used by {registros} ripening registrations"
        )));
    }
    Ok(())
}

/// Delete a tag that no registration uses.
pub async fn remover_fita(pool: &DbPool, id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, Uuid>("SELECT id FROM fitas_banana WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("fita_banana"))?;

    let registros: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM controles_banana WHERE fita_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if let Err(err) = exigir_fita_livre(registros) {
        tx.rollback().await?;
        return Err(err);
    }

    sqlx::query("DELETE FROM fitas_banana WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                AppError::Conflict("tag is used by ripening registrations".to_string())
            } else {
                AppError::Database(err)
            }
        })?;

    tx.commit().await?;
    Ok(())
}

async fn exigir_fita_ativa(pool: &DbPool, fita_id: Uuid) -> Result<(), AppError> {
    let ativo: Option<bool> = sqlx::query_scalar("SELECT ativo FROM fitas_banana WHERE id = $1")
        .bind(fita_id)
        .fetch_optional(pool)
        .await?;

    match ativo {
        None => Err(AppError::field("fita_id", "tag does not exist")),
        Some(false) => Err(AppError::field("fita_id", "tag is inactive")),
        Some(true) => Ok(()),
    }
}

async fn buscar_controle_row(pool: &DbPool, id: Uuid) -> Result<ControleBanana, AppError> {
    sqlx::query_as::<_, ControleBanana>(&format!("{SELECT_CONTROLE} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("controle_banana"))
}

pub async fn criar_controle(
    pool: &DbPool,
    request: NovoControle,
) -> Result<ControleBananaResponse, AppError> {
    let hoje = hoje();
    let novo = request.normalizado(hoje)?;
    exigir_fita_ativa(pool, novo.fita_id).await?;

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO controles_banana (fita_id, area, data_registro, quantidade_cachos, observacoes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(novo.fita_id)
    .bind(&novo.area)
    .bind(novo.data_registro)
    .bind(novo.quantidade_cachos)
    .bind(&novo.observacoes)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        controle_id = %id,
        area = %novo.area,
        cachos = novo.quantidade_cachos,
        "ripening registration created"
    );

    let controle = buscar_controle_row(pool, id).await?;
    Ok(ControleBananaResponse::new(controle, hoje))
}

pub async fn listar_controles(
    pool: &DbPool,
    filtro: FiltroControles,
) -> Result<Vec<ControleBananaResponse>, AppError> {
    let referencia = filtro.data_referencia.unwrap_or_else(hoje);
    let area = filtro
        .area
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    let controles = sqlx::query_as::<_, ControleBanana>(&format!(
        r#"{SELECT_CONTROLE}
        WHERE ($1::UUID IS NULL OR c.fita_id = $1)
          AND ($2::TEXT IS NULL OR c.area ILIKE $2)
        ORDER BY c.created_at DESC
        "#
    ))
    .bind(filtro.fita_id)
    .bind(area)
    .fetch_all(pool)
    .await?;

    Ok(controles
        .into_iter()
        .filter(|c| filtro.status.is_none_or(|status| c.status_em(referencia) == status))
        .map(|c| ControleBananaResponse::new(c, referencia))
        .collect())
}

pub async fn buscar_controle(
    pool: &DbPool,
    id: Uuid,
    referencia: Option<NaiveDate>,
) -> Result<ControleBananaResponse, AppError> {
    let controle = buscar_controle_row(pool, id).await?;
    Ok(ControleBananaResponse::new(
        controle,
        referencia.unwrap_or_else(hoje),
    ))
}

pub async fn atualizar_controle(
    pool: &DbPool,
    id: Uuid,
    request: AtualizarControle,
) -> Result<ControleBananaResponse, AppError> {
    let hoje = hoje();
    let atual = buscar_controle_row(pool, id).await?;
    let novo = request.aplicar(&atual).normalizado(hoje)?;

    if novo.quantidade_cachos < atual.cachos_colhidos {
        return Err(AppError::field(
            "quantidade_cachos",
            format!(
                "cannot be less than the {} bunches already harvested",
                atual.cachos_colhidos
            ),
        ));
    }
    if novo.fita_id != atual.fita_id {
        exigir_fita_ativa(pool, novo.fita_id).await?;
    }

    sqlx::query(
        r#"
        UPDATE controles_banana
        SET fita_id = $2, area = $3, data_registro = $4, quantidade_cachos = $5,
            observacoes = $6, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(novo.fita_id)
    .bind(&novo.area)
    .bind(novo.data_registro)
    .bind(novo.quantidade_cachos)
    .bind(&novo.observacoes)
    .execute(pool)
    .await?;

    let controle = buscar_controle_row(pool, id).await?;
    Ok(ControleBananaResponse::new(controle, hoje))
}

pub async fn remover_controle(pool: &DbPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM controles_banana WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("controle_banana"));
    }
    Ok(())
}

/// Record harvested bunches for a registration.
///
/// # Errors
///
/// - `Validation`: quantity is zero or negative
/// - `BusinessRule`: quantity exceeds the bunches still pending
pub async fn registrar_colheita(
    pool: &DbPool,
    id: Uuid,
    quantidade: i32,
) -> Result<ControleBananaResponse, AppError> {
    if quantidade <= 0 {
        return Err(AppError::field("quantidade", "must be greater than zero"));
    }

    let mut tx = pool.begin().await?;

    let (quantidade_cachos, cachos_colhidos): (i32, i32) = sqlx::query_as(
        "SELECT quantidade_cachos, cachos_colhidos FROM controles_banana WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("controle_banana"))?;

    let pendentes = quantidade_cachos - cachos_colhidos;
    if quantidade > pendentes {
        tx.rollback().await?;
        return Err(AppError::BusinessRule(format!(
            "only {pendentes} bunches are pending harvest"
        )));
    }

    sqlx::query(
        "UPDATE controles_banana SET cachos_colhidos = cachos_colhidos + $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(quantidade)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(controle_id = %id, quantidade, "bunches harvested");

    buscar_controle(pool, id, None).await
}

/// Check a calendar period: supported years, `fim` not before `inicio`,
/// at most a year long.
pub fn validar_periodo(periodo: &PeriodoCalendario) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    validation::data(&mut errors, "inicio", periodo.inicio);
    validation::data(&mut errors, "fim", periodo.fim);
    if let Some(referencia) = periodo.data_referencia {
        validation::data(&mut errors, "data_referencia", referencia);
    }
    errors.into_result()?;

    if periodo.fim < periodo.inicio {
        return Err(AppError::field("fim", "must not be before inicio"));
    }
    if (periodo.fim - periodo.inicio).num_days() > MAX_DIAS_CALENDARIO {
        return Err(AppError::field(
            "fim",
            format!("period cannot exceed {MAX_DIAS_CALENDARIO} days"),
        ));
    }
    Ok(())
}

/// Entries for the harvest calendar, sorted by window start.
pub fn montar_calendario(
    controles: Vec<ControleBanana>,
    periodo: &PeriodoCalendario,
    referencia: NaiveDate,
) -> Vec<ControleBananaResponse> {
    let mut entradas: Vec<ControleBananaResponse> = controles
        .into_iter()
        .filter(|c| c.cachos_pendentes() > 0)
        .filter(|c| JanelaColheita::para(c.data_registro).sobrepoe(periodo.inicio, periodo.fim))
        .map(|c| ControleBananaResponse::new(c, referencia))
        .collect();

    entradas.sort_by(|a, b| {
        a.janela
            .inicio_colheita
            .cmp(&b.janela.inicio_colheita)
            .then_with(|| a.area.cmp(&b.area))
    });
    entradas
}

/// Registrations with pending bunches whose harvest window overlaps the period.
///
/// Derived fields are computed against `data_referencia`, today when omitted.
pub async fn calendario(
    pool: &DbPool,
    periodo: PeriodoCalendario,
) -> Result<Vec<ControleBananaResponse>, AppError> {
    validar_periodo(&periodo)?;

    // Only registrations whose window [registro+100, registro+120] can overlap
    let registro_min = periodo
        .inicio
        .checked_sub_signed(Duration::days(DIAS_LIMITE))
        .ok_or_else(|| AppError::field("inicio", "date is out of range"))?;
    let registro_max = periodo
        .fim
        .checked_sub_signed(Duration::days(DIAS_INICIO_COLHEITA))
        .ok_or_else(|| AppError::field("fim", "date is out of range"))?;

    let controles = sqlx::query_as::<_, ControleBanana>(&format!(
        "{SELECT_CONTROLE} WHERE c.data_registro BETWEEN $1 AND $2 AND c.cachos_colhidos < c.quantidade_cachos"
    ))
    .bind(registro_min)
    .bind(registro_max)
    .fetch_all(pool)
    .await?;

    let referencia = periodo.referencia();
    Ok(montar_calendario(controles, &periodo, referencia))
}

/// Registration count and pending bunches per maturation status.
///
/// Fully harvested registrations are left out.
pub fn resumir(
    controles: &[ControleBanana],
    referencia: NaiveDate,
) -> BTreeMap<StatusMaturacao, ResumoStatus> {
    let mut resumo: BTreeMap<StatusMaturacao, ResumoStatus> = StatusMaturacao::ALL
        .into_iter()
        .map(|status| (status, ResumoStatus::default()))
        .collect();

    for controle in controles.iter().filter(|c| c.cachos_pendentes() > 0) {
        let entry = resumo.entry(controle.status_em(referencia)).or_default();
        entry.registros += 1;
        entry.cachos_pendentes += i64::from(controle.cachos_pendentes());
    }
    resumo
}

pub async fn resumo(
    pool: &DbPool,
    referencia: Option<NaiveDate>,
) -> Result<BTreeMap<StatusMaturacao, ResumoStatus>, AppError> {
    let controles = sqlx::query_as::<_, ControleBanana>(&format!(
        "{SELECT_CONTROLE} WHERE c.cachos_colhidos < c.quantidade_cachos"
    ))
    .fetch_all(pool)
    .await?;

    Ok(resumir(&controles, referencia.unwrap_or_else(hoje)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn controle(area: &str, registro: NaiveDate, total: i32, colhidos: i32) -> ControleBanana {
        let now = Utc::now();
        ControleBanana {
            id: Uuid::new_v4(),
            fita_id: Uuid::nil(),
            fita_nome: "Azul".into(),
            fita_cor_hex: "#1E40AF".into(),
            area: area.into(),
            data_registro: registro,
            quantidade_cachos: total,
            cachos_colhidos: colhidos,
            observacoes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn period_must_be_ordered_and_bounded() {
        let invertido = PeriodoCalendario {
            inicio: date(2025, 5, 1),
            fim: date(2025, 4, 1),
            data_referencia: None,
        };
        assert!(validar_periodo(&invertido).is_err());

        let longo = PeriodoCalendario {
            inicio: date(2025, 1, 1),
            fim: date(2026, 6, 1),
            data_referencia: None,
        };
        assert!(validar_periodo(&longo).is_err());

        let ok = PeriodoCalendario {
            inicio: date(2025, 4, 1),
            fim: date(2025, 4, 30),
            data_referencia: None,
        };
        assert!(validar_periodo(&ok).is_ok());
    }

    #[test]
    fn period_outside_supported_years_is_a_field_error() {
        let remoto = PeriodoCalendario {
            inicio: NaiveDate::from_ymd_opt(-262_143, 1, 1).unwrap(),
            fim: NaiveDate::from_ymd_opt(-262_143, 1, 2).unwrap(),
            data_referencia: None,
        };
        match validar_periodo(&remoto) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("inicio").is_some());
                assert!(errors.get("fim").is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn calendar_rejects_remote_dates_before_querying() {
        let pool = crate::db::create_lazy_pool("postgres://bananal@127.0.0.1:1/bananal_test").unwrap();
        let remoto = PeriodoCalendario {
            inicio: NaiveDate::MIN,
            fim: NaiveDate::MIN,
            data_referencia: None,
        };
        let err = calendario(&pool, remoto).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn tag_in_use_cannot_be_deleted() {
        assert!(exigir_fita_livre(0).is_ok());
        let err = exigir_fita_livre(3).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn calendar_keeps_pending_overlapping_windows_in_order() {
        let periodo = PeriodoCalendario {
            inicio: date(2025, 4, 1),
            fim: date(2025, 4, 30),
            data_referencia: None,
        };
        let controles = vec![
            // window 2025-04-21..2025-05-11
            controle("B", date(2025, 1, 11), 100, 0),
            // window 2025-04-11..2025-05-01
            controle("A", date(2025, 1, 1), 100, 10),
            // fully harvested
            controle("C", date(2025, 1, 1), 50, 50),
            // window starts 2025-06-09, outside the period
            controle("D", date(2025, 3, 1), 80, 0),
        ];

        let entradas = montar_calendario(controles, &periodo, date(2025, 4, 15));
        let areas: Vec<&str> = entradas.iter().map(|e| e.area.as_str()).collect();
        assert_eq!(areas, vec!["A", "B"]);
        assert_eq!(entradas[0].cachos_pendentes, 90);
    }

    #[test]
    fn summary_groups_pending_bunches_by_status() {
        let referencia = date(2025, 4, 20);
        let controles = vec![
            controle("A", date(2025, 1, 1), 100, 10),  // 109 days: colheita
            controle("B", date(2025, 1, 5), 50, 0),    // 105 days: colheita
            controle("C", date(2024, 12, 20), 40, 0),  // 121 days: vencido
            controle("D", date(2025, 3, 1), 70, 0),    // 50 days: maturacao
            controle("E", date(2024, 12, 25), 30, 30), // harvested, ignored
        ];

        let resumo = resumir(&controles, referencia);

        assert_eq!(
            resumo[&StatusMaturacao::Colheita],
            ResumoStatus {
                registros: 2,
                cachos_pendentes: 140
            }
        );
        assert_eq!(resumo[&StatusMaturacao::Vencido].registros, 1);
        assert_eq!(resumo[&StatusMaturacao::Maturacao].cachos_pendentes, 70);
        assert_eq!(resumo[&StatusMaturacao::Alerta], ResumoStatus::default());
    }
}
