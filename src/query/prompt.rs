// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use super::QueryRequest;
use crate::model::FuelBrand;

use indoc::{formatdoc, indoc};


const RESPONSE_SHAPE: &str = indoc! {r#"
  Responde ÚNICAMENTE con un JSON válido:
  {
    "alertTriggered": boolean,
    "nearestStation": {
      "name": string,
      "distance": string,
      "isOpen": boolean,
      "locationDetails": string
    },
    "nextStation": { "name": string, "distance": string },
    "traffic": { "status": string, "summary": string, "delayMinutes": number },
    "weather": { "condition": string, "summary": string },
    "poi": { "restAreas": string }
  }
  "alertTriggered" es true si encontraste una gasolinera en ruta.
  "traffic.status" es uno de "Fluido", "Denso", "Atasco".
"#};

const EMERGENCY_SHAPE: &str = indoc! {r#"
  Responde en JSON:
  {
    "alertTriggered": true,
    "nearestStation": { "name": "NOMBRE HOSPITAL/POLICIA", "distance": "DISTANCIA", "isOpen": true, "locationDetails": "Dirección completa de emergencia" },
    "nextStation": { "name": "---", "distance": "---" },
    "traffic": { "status": "EMERGENCIA", "summary": "Buscando ayuda médica/policial más cercana.", "delayMinutes": 0 },
    "weather": { "condition": "N/A", "summary": "N/A" },
    "poi": { "restAreas": "N/A" }
  }
"#};


/// Builds the model prompt for a request.
pub fn build(request: &QueryRequest) -> String {
  if request.emergency {
    emergency(request)
  } else {
    route_scan(request)
  }
}

fn emergency(request: &QueryRequest) -> String {
  formatdoc! {"
    URGENTE: EMERGENCIA. El conductor ha solicitado ayuda inmediata.
    Ubicación: Lat {lat}, Lng {lon}.

    OBJETIVO:
    Busca el HOSPITAL, CENTRO DE SALUD o COMISARÍA DE POLICÍA más cercano en la ruta o ubicación actual.
    Ignora gasolineras o clima. Prioridad absoluta a servicios de emergencia.

    {shape}",
    lat = request.sample.latitude,
    lon = request.sample.longitude,
    shape = EMERGENCY_SHAPE}
}

fn route_scan(request: &QueryRequest) -> String {
  let prefs = &request.preferences;

  let destination = if prefs.destination.trim().is_empty() {
    "Estoy viajando por la autovía/carretera actual (detéctala por \
     coordenadas). Estima mi dirección según mi rumbo."
                                                        .to_owned()
  } else {
    format!("Estoy viajando hacia {}. Busca resultados EN RUTA hacia ese \
             destino. Identifica carreteras (A-1, AP-7, etc) y salidas.",
            prefs.destination.trim())
  };

  let search_mode = if request.extended_search {
    "MODO 'BUSCAR MÁS ALLÁ' ACTIVADO: Amplía el radio de búsqueda a 50km. \
     Incluye pueblos y desvíos cercanos."
  } else {
    "MODO ESTRICTO EN RUTA: Busca establecimientos estrictamente en la \
     trayectoria de la ruta."
  };

  let traffic = if request.scan_traffic_now {
    "Busca incidentes de tráfico, retenciones o accidentes reportados \
     recientemente en mi ruta/carretera actual."
  } else {
    "Ignora tráfico."
  };

  let weather = if request.scan_weather_now {
    "Busca el estado actual del clima (lluvia, viento, nieve) en mi \
     ubicación y destino."
  } else {
    "Ignora clima."
  };

  let rest_areas = if prefs.filter_rest_areas {
    "Busca áreas de descanso en la ruta."
  } else {
    "No busques áreas de descanso."
  };

  let motion = match (request.sample.speed_mps, request.sample.heading_deg) {
    (Some(_), Some(heading)) => {
      format!("\nVelocidad: {} km/h, rumbo {:.0}°.",
              request.sample.speed_kmh(),
              heading)
    }
    (Some(_), None) => {
      format!("\nVelocidad: {} km/h.", request.sample.speed_kmh())
    }
    (None, Some(heading)) => format!("\nRumbo {:.0}°.", heading),
    (None, None) => String::new(),
  };

  formatdoc! {"
    Actúa como un copiloto de IA avanzado.
    Mi Ubicación: Lat {lat}, Lng {lon}.{motion}
    {destination}
    {search_mode}

    HERRAMIENTAS DISPONIBLES:
    1. 'googleMaps': Úsala OBLIGATORIAMENTE para encontrar Gasolineras y obtener ubicación exacta.
    2. 'googleSearch': Úsala OBLIGATORIAMENTE para buscar noticias recientes de tráfico y el clima actual.

    OBJETIVOS:
    1. GASOLINERAS (Usa googleMaps): Encuentra la SIGUIENTE gasolinera {scope} (abierta) en mi ruta.
       - NO filtres por cercanía inmediata. Necesito la siguiente en la ruta, aunque esté a 80km.
       - IMPORTANTE: Debes identificar la VÍA (Carretera) y el PUNTO KILOMÉTRICO (Pk) o Salida exacta.
       - Rellena 'locationDetails' con esta información (Ej: \"A-6, Km 35.5, Salida Guadarrama\").
       - NO busques servicios de cafetería ni tipos de combustible. Solo ubicación.
    2. POI (Usa googleMaps): {rest_areas}
    3. TRÁFICO (Usa googleSearch): {traffic}
    4. CLIMA (Usa googleSearch): {weather}

    {shape}",
    lat = request.sample.latitude,
    lon = request.sample.longitude,
    motion = motion,
    destination = destination,
    search_mode = search_mode,
    scope = brand_scope(prefs.fuel_brand),
    rest_areas = rest_areas,
    traffic = traffic,
    weather = weather,
    shape = RESPONSE_SHAPE}
}

fn brand_scope(brand: FuelBrand) -> String {
  match brand {
    FuelBrand::All => {
      "de cualquier marca conocida (Repsol, BP, Shell, Cepsa/Moeve, Galp)"
        .to_owned()
    }
    brand => format!("solo de la marca {}", brand.to_string().to_uppercase()),
  }
}

// fin --------------------------------------------------------------------- //

#[cfg(test)]
mod tests {
  use super::build;
  use crate::{model::{CoordinateSample, FuelBrand, SearchPreferences},
              query::QueryRequest};


  fn request() -> QueryRequest {
    QueryRequest { sample:           CoordinateSample::new(40.5, -4.0),
                   preferences:      SearchPreferences::default(),
                   extended_search:  false,
                   scan_traffic_now: true,
                   scan_weather_now: false,
                   emergency:        false, }
  }

  #[test]
  fn route_scan_prompt_test() {
    let prompt = build(&request());

    assert!(prompt.contains("Lat 40.5, Lng -4"));
    assert!(prompt.contains("solo de la marca REPSOL"));
    assert!(prompt.contains("MODO ESTRICTO EN RUTA"));
    assert!(prompt.contains("Busca incidentes de tráfico"));
    assert!(prompt.contains("Ignora clima."));
    assert!(prompt.contains("Estima mi dirección según mi rumbo."));
    assert!(prompt.contains("\"alertTriggered\": boolean"));
  }

  #[test]
  fn route_scan_options_test() {
    let mut request = request();
    request.extended_search = true;
    request.scan_traffic_now = false;
    request.sample = request.sample.with_speed(25.0).with_heading(271.4);
    request.preferences.destination = " Segovia ".into();
    request.preferences.fuel_brand = FuelBrand::All;
    request.preferences.filter_rest_areas = true;

    let prompt = build(&request);

    assert!(prompt.contains("Velocidad: 90 km/h, rumbo 271°."));
    assert!(prompt.contains("Estoy viajando hacia Segovia. Busca"));
    assert!(prompt.contains("Amplía el radio de búsqueda a 50km."));
    assert!(prompt.contains("cualquier marca conocida"));
    assert!(prompt.contains("Busca áreas de descanso en la ruta."));
    assert!(prompt.contains("Ignora tráfico."));
  }

  #[test]
  fn emergency_prompt_test() {
    let request = QueryRequest::emergency(CoordinateSample::new(40.5, -4.0),
                                          SearchPreferences::default());
    let prompt = build(&request);

    assert!(prompt.starts_with("URGENTE: EMERGENCIA."));
    assert!(prompt.contains("COMISARÍA DE POLICÍA"));
    assert!(!prompt.contains("GASOLINERAS"));
  }
}
