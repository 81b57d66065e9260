use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use tracing::trace;

/// Valor acumulado de un contador en un instante.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub name: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub value: i64,
}

/// Contadores del lado que mide (p. ej. el cliente que envía jobs).
#[derive(Debug, Default)]
pub struct Counters {
    counters: Mutex<BTreeMap<String, Counter>>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un contador en cero. Devuelve false si ya existía.
    pub fn try_register(&self, name: &str, description: &str) -> bool {
        let mut counters = self.counters.lock().unwrap();
        if counters.contains_key(name) {
            return false;
        }
        counters.insert(
            name.to_string(),
            Counter {
                name: name.to_string(),
                description: description.to_string(),
                timestamp: Utc::now(),
                value: 0,
            },
        );
        true
    }

    /// Incrementa un contador; si no estaba registrado se crea sin descripción.
    pub fn increment(&self, name: &str, by: i64) {
        let mut counters = self.counters.lock().unwrap();
        let counter = counters.entry(name.to_string()).or_insert_with(|| Counter {
            name: name.to_string(),
            description: String::new(),
            timestamp: Utc::now(),
            value: 0,
        });
        counter.value += by;
        counter.timestamp = Utc::now();
    }

    pub fn value(&self, name: &str) -> Option<i64> {
        self.counters.lock().unwrap().get(name).map(|c| c.value)
    }

    pub fn snapshot(&self) -> Vec<Counter> {
        self.counters.lock().unwrap().values().cloned().collect()
    }
}

#[derive(Debug, Clone)]
struct CounterData {
    counter: Counter,
    increment_since_last_sink: i64,
}

impl CounterData {
    fn new(counter: Counter) -> Self {
        let increment_since_last_sink = counter.value;
        Self {
            counter,
            increment_since_last_sink,
        }
    }

    fn update(&mut self, counter: &Counter) {
        self.increment_since_last_sink += counter.value - self.counter.value;
        self.counter = counter.clone();
    }
}

/// Tabla de contadores del lado que agrega.
/// Guarda el último valor de cada contador y cuánto creció desde el último sink.
#[derive(Debug, Default)]
pub struct CountersData {
    counters: Mutex<HashMap<String, CounterData>>,
}

impl CountersData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, counters: &[Counter]) {
        let mut map = self.counters.lock().unwrap();
        for counter in counters {
            let data = map
                .entry(counter.name.clone())
                .and_modify(|d| d.update(counter))
                .or_insert_with(|| CounterData::new(counter.clone()));

            trace!(
                "contador {}: valor={}, descripcion={}, t={}, incremento desde el ultimo sink={}",
                counter.name,
                counter.value,
                counter.description,
                counter.timestamp,
                data.increment_since_last_sink
            );
        }
    }

    /// Pone a cero los incrementos de todos los contadores (después de un sink).
    pub fn reset(&self) {
        for data in self.counters.lock().unwrap().values_mut() {
            data.increment_since_last_sink = 0;
        }
    }

    /// Pares (nombre, valor) listos para mandar al sink
    pub fn counter_data(&self) -> BTreeSet<(String, String)> {
        self.counters
            .lock()
            .unwrap()
            .values()
            .map(|d| (d.counter.name.clone(), d.counter.value.to_string()))
            .collect()
    }

    /// true si la suma de incrementos pendientes supera el umbral
    pub fn trigger_sink(&self, threshold: i64) -> bool {
        let total: i64 = self
            .counters
            .lock()
            .unwrap()
            .values()
            .map(|d| d.increment_since_last_sink)
            .sum();
        total > threshold
    }
}
